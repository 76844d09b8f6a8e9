//! Definiciones de registros para el MPU6050
//!
//! El MPU6050 tiene un único mapa de registros; la memoria interna del DMP
//! se direcciona aparte mediante banco/offset (ver `registers::MEM_*`).

pub mod registers {
    // Offsets de compensación térmica del giroscopio: [7] PWR_MODE, [6:1] OFFS_TC, [0] OTP_BNK_VLD
    pub const XG_OFFS_TC: u8 = 0x00;
    pub const YG_OFFS_TC: u8 = 0x01;
    pub const ZG_OFFS_TC: u8 = 0x02;

    // Offsets de usuario del giroscopio (16 bits, big-endian)
    pub const XG_OFFS_USR: u8 = 0x13;
    pub const YG_OFFS_USR: u8 = 0x15;
    pub const ZG_OFFS_USR: u8 = 0x17;

    // Configuración
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;

    // Detección de movimiento
    pub const MOT_THR: u8 = 0x1F;
    pub const MOT_DUR: u8 = 0x20;
    pub const ZRMOT_THR: u8 = 0x21;
    pub const ZRMOT_DUR: u8 = 0x22;

    pub const FIFO_EN: u8 = 0x23;

    // Maestro I2C auxiliar
    pub const I2C_MST_CTRL: u8 = 0x24;
    pub const I2C_SLV0_ADDR: u8 = 0x25;
    pub const I2C_SLV0_REG: u8 = 0x26;
    pub const I2C_SLV0_CTRL: u8 = 0x27;

    // Interrupciones
    pub const INT_PIN_CFG: u8 = 0x37;
    pub const INT_ENABLE: u8 = 0x38;
    pub const DMP_INT_STATUS: u8 = 0x39;
    pub const INT_STATUS: u8 = 0x3A;

    // Datos de sensores
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const TEMP_OUT_H: u8 = 0x41;
    pub const GYRO_XOUT_H: u8 = 0x43;

    // Control de usuario y energía
    pub const USER_CTRL: u8 = 0x6A;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const PWR_MGMT_2: u8 = 0x6C;

    // Acceso a la memoria del DMP
    pub const MEM_BANK_SEL: u8 = 0x6D;
    pub const MEM_START_ADDR: u8 = 0x6E;
    pub const MEM_R_W: u8 = 0x6F;

    // Configuración no documentada del DMP
    pub const DMP_CFG_1: u8 = 0x70;
    pub const DMP_CFG_2: u8 = 0x71;

    // FIFO
    pub const FIFO_COUNTH: u8 = 0x72;
    pub const FIFO_COUNTL: u8 = 0x73;
    pub const FIFO_R_W: u8 = 0x74;

    pub const WHO_AM_I: u8 = 0x75;
}

/// Direcciones dentro de la memoria del DMP
pub mod dmp {
    /// Número de bancos de memoria del DMP
    pub const BANK_COUNT: usize = 32;
    /// Tamaño de cada banco en bytes
    pub const BANK_SIZE: usize = 256;

    /// Banco de usuario que contiene la revisión de hardware
    pub const HW_REVISION_BANK: u8 = 0x10;
    pub const HW_REVISION_OFFSET: u8 = 0x06;

    /// Divisor de la tasa de salida del DMP (D_0_22)
    pub const D_0_22_BANK: u8 = 0x02;
    pub const D_0_22_OFFSET: u8 = 0x16;

    /// Frecuencia interna del DMP (Hz)
    pub const DMP_SAMPLE_RATE: u16 = 200;
}
