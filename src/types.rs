//! Definiciones de tipos y constantes comunes para el MPU6050

use bitflags::bitflags;

/// Escalas completas disponibles para el giroscopio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GyroFullScale {
    /// ±250 dps
    Fs250Dps = 0,
    /// ±500 dps
    Fs500Dps = 1,
    /// ±1000 dps
    Fs1000Dps = 2,
    /// ±2000 dps
    Fs2000Dps = 3,
}

impl Default for GyroFullScale {
    fn default() -> Self {
        GyroFullScale::Fs2000Dps
    }
}

impl From<u8> for GyroFullScale {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => GyroFullScale::Fs250Dps,
            1 => GyroFullScale::Fs500Dps,
            2 => GyroFullScale::Fs1000Dps,
            _ => GyroFullScale::Fs2000Dps,
        }
    }
}

/// Escalas completas disponibles para el acelerómetro
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccelFullScale {
    /// ±2g
    Fs2G = 0,
    /// ±4g
    Fs4G = 1,
    /// ±8g
    Fs8G = 2,
    /// ±16g
    Fs16G = 3,
}

impl Default for AccelFullScale {
    fn default() -> Self {
        AccelFullScale::Fs2G
    }
}

impl From<u8> for AccelFullScale {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => AccelFullScale::Fs2G,
            1 => AccelFullScale::Fs4G,
            2 => AccelFullScale::Fs8G,
            _ => AccelFullScale::Fs16G,
        }
    }
}

/// Ancho de banda del filtro paso bajo digital (DLPF_CFG, bits [2:0] de CONFIG)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DlpfBandwidth {
    Hz256 = 0,
    Hz188 = 1,
    Hz98 = 2,
    Hz42 = 3,
    Hz20 = 4,
    Hz10 = 5,
    Hz5 = 6,
    /// Filtro desactivado (giroscopio a 8 kHz)
    Hz2100NoLpf = 7,
}

impl DlpfBandwidth {
    /// Convierte el valor del registro
    pub fn from_bits(value: u8) -> Option<Self> {
        match value {
            0 => Some(DlpfBandwidth::Hz256),
            1 => Some(DlpfBandwidth::Hz188),
            2 => Some(DlpfBandwidth::Hz98),
            3 => Some(DlpfBandwidth::Hz42),
            4 => Some(DlpfBandwidth::Hz20),
            5 => Some(DlpfBandwidth::Hz10),
            6 => Some(DlpfBandwidth::Hz5),
            7 => Some(DlpfBandwidth::Hz2100NoLpf),
            _ => None,
        }
    }

    /// Mayor ancho de banda que no supera `rate` Hz (mínimo 5 Hz)
    pub fn for_rate(rate: u16) -> Self {
        if rate >= 188 {
            DlpfBandwidth::Hz188
        } else if rate >= 98 {
            DlpfBandwidth::Hz98
        } else if rate >= 42 {
            DlpfBandwidth::Hz42
        } else if rate >= 20 {
            DlpfBandwidth::Hz20
        } else if rate >= 10 {
            DlpfBandwidth::Hz10
        } else {
            DlpfBandwidth::Hz5
        }
    }
}

/// Fuente de reloj (CLKSEL, bits [2:0] de PWR_MGMT_1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockSource {
    /// Oscilador interno de 8 MHz
    Internal = 0,
    PllGyroX = 1,
    PllGyroY = 2,
    PllGyroZ = 3,
    PllExternal32k = 4,
    PllExternal19M = 5,
    /// Detiene el reloj y mantiene el generador de tiempos en reset
    Stop = 7,
}

impl ClockSource {
    pub fn from_bits(value: u8) -> Option<Self> {
        match value {
            0 => Some(ClockSource::Internal),
            1 => Some(ClockSource::PllGyroX),
            2 => Some(ClockSource::PllGyroY),
            3 => Some(ClockSource::PllGyroZ),
            4 => Some(ClockSource::PllExternal32k),
            5 => Some(ClockSource::PllExternal19M),
            7 => Some(ClockSource::Stop),
            _ => None,
        }
    }
}

/// Origen del pin FSYNC (EXT_SYNC_SET, bits [5:3] de CONFIG)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExternalFrameSync {
    Disabled = 0,
    TempOutL = 1,
    GyroXoutL = 2,
    GyroYoutL = 3,
    GyroZoutL = 4,
    AccelXoutL = 5,
    AccelYoutL = 6,
    AccelZoutL = 7,
}

impl From<u8> for ExternalFrameSync {
    fn from(value: u8) -> Self {
        match value & 0x07 {
            0 => ExternalFrameSync::Disabled,
            1 => ExternalFrameSync::TempOutL,
            2 => ExternalFrameSync::GyroXoutL,
            3 => ExternalFrameSync::GyroYoutL,
            4 => ExternalFrameSync::GyroZoutL,
            5 => ExternalFrameSync::AccelXoutL,
            6 => ExternalFrameSync::AccelYoutL,
            _ => ExternalFrameSync::AccelZoutL,
        }
    }
}

bitflags! {
    /// Sensores del dispositivo. Usa la misma disposición que el registro FIFO_EN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sensors: u8 {
        const GYRO_X = 0x40;
        const GYRO_Y = 0x20;
        const GYRO_Z = 0x10;
        const GYRO = Self::GYRO_X.bits() | Self::GYRO_Y.bits() | Self::GYRO_Z.bits();
        const ACCEL = 0x08;
        /// Magnetómetro conectado al bus auxiliar
        const COMPASS = 0x01;
    }
}

/// Bits útiles para configuración y control
pub mod bits {
    // PWR_MGMT_1
    pub const H_RESET: u8 = 0x80;
    pub const SLEEP: u8 = 0x40;
    pub const CYCLE: u8 = 0x20;
    pub const CLKSEL_BIT: u8 = 2;
    pub const CLKSEL_LENGTH: u8 = 3;

    // PWR_MGMT_2
    pub const STBY_XA: u8 = 0x20;
    pub const STBY_YA: u8 = 0x10;
    pub const STBY_ZA: u8 = 0x08;
    pub const STBY_XG: u8 = 0x04;
    pub const STBY_YG: u8 = 0x02;
    pub const STBY_ZG: u8 = 0x01;
    pub const PWR_ACCEL_STBY: u8 = STBY_XA | STBY_YA | STBY_ZA;
    pub const PWR_GYRO_STBY: u8 = STBY_XG | STBY_YG | STBY_ZG;
    pub const LP_WAKE_CTRL_SHIFT: u8 = 6;

    // USER_CTRL
    pub const DMP_EN: u8 = 0x80;
    pub const FIFO_EN: u8 = 0x40;
    pub const I2C_MST_EN: u8 = 0x20;
    pub const DMP_RST: u8 = 0x08;
    pub const FIFO_RST: u8 = 0x04;
    pub const I2C_MST_RST: u8 = 0x02;

    // INT_PIN_CFG
    pub const INT_LEVEL: u8 = 0x80;
    pub const LATCH_INT_EN: u8 = 0x20;
    pub const INT_ANYRD_2CLEAR: u8 = 0x10;
    pub const I2C_BYPASS_EN: u8 = 0x02;

    // INT_ENABLE
    pub const DMP_INT_EN: u8 = 0x02;
    pub const DATA_RDY_EN: u8 = 0x01;
    /// Interrupciones DMP + desbordamiento del FIFO
    pub const DMP_FIFO_OFLOW_INT: u8 = 0x12;
    /// Interrupciones DMP + desbordamiento del FIFO + movimiento nulo
    pub const DMP_PATCH_INT: u8 = 0x32;

    // INT_STATUS
    pub const FIFO_OFLOW_INT: u8 = 0x10;

    // Campos de CONFIG / GYRO_CONFIG / ACCEL_CONFIG
    pub const DLPF_CFG_BIT: u8 = 2;
    pub const DLPF_CFG_LENGTH: u8 = 3;
    pub const EXT_SYNC_SET_BIT: u8 = 5;
    pub const EXT_SYNC_SET_LENGTH: u8 = 3;
    pub const FS_SEL_BIT: u8 = 4;
    pub const FS_SEL_LENGTH: u8 = 2;
    pub const FS_SEL_SHIFT: u8 = 3;

    // XG/YG/ZG_OFFS_TC
    pub const OFFS_TC_BIT: u8 = 6;
    pub const OFFS_TC_LENGTH: u8 = 6;
    pub const OTP_BNK_VLD_BIT: u8 = 0;

    // WHO_AM_I
    pub const WHO_AM_I_BIT: u8 = 6;
    pub const WHO_AM_I_LENGTH: u8 = 6;

    // MEM_BANK_SEL
    pub const MEM_BANK_MASK: u8 = 0x1F;
    pub const MEM_USER_BANK: u8 = 0x20;
    pub const MEM_PREFETCH: u8 = 0x40;

    /// Máscara de `length` bits ya desplazada a su posición
    #[inline]
    fn field_mask(high_bit: u8, length: u8) -> u8 {
        let width = ((1u16 << length) - 1) as u8;
        width << (high_bit + 1 - length)
    }

    /// Extrae un campo de `length` bits cuyo bit más alto es `high_bit`,
    /// alineado a la derecha.
    #[inline]
    pub(crate) fn extract(byte: u8, high_bit: u8, length: u8) -> u8 {
        (byte & field_mask(high_bit, length)) >> (high_bit + 1 - length)
    }

    /// Inserta `value` en el campo indicado conservando el resto de bits.
    #[inline]
    pub(crate) fn merge(byte: u8, high_bit: u8, length: u8, value: u8) -> u8 {
        let mask = field_mask(high_bit, length);
        let shifted = (value << (high_bit + 1 - length)) & mask;
        (byte & !mask) | shifted
    }
}

/// Definiciones de tamaños de datos
pub mod data_defs {
    /// Capacidad del FIFO en bytes
    pub const MAX_FIFO: u16 = 1024;
    /// Tamaño del paquete DMP por defecto (cuaternión + giroscopio + acelerómetro)
    pub const DMP_PACKET_SIZE: u16 = 42;
    /// Bytes máximos por escritura en serie
    pub const MAX_SERIAL_WRITE: usize = 256;
    /// Valor esperado en WHO_AM_I[6:1]
    pub const WHO_AM_I_EXPECTED: u8 = 0x34;
    /// Dirección I2C con AD0 a nivel bajo
    pub const ADDRESS_LOW: u8 = 0x68;
    /// Dirección I2C con AD0 a nivel alto
    pub const ADDRESS_HIGH: u8 = 0x69;
}
