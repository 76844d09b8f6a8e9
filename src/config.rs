//! Configuración inicial del driver MPU6050

use crate::types::{data_defs, AccelFullScale, DlpfBandwidth, GyroFullScale};

/// Parámetros aplicados por `initialize()` y por el cargador del DMP
#[derive(Debug, Clone)]
pub struct Mpu6050Config {
    /// Escala del giroscopio tras la inicialización
    pub gyro_fullscale: GyroFullScale,
    /// Escala del acelerómetro tras la inicialización
    pub accel_fullscale: AccelFullScale,
    /// Filtro paso bajo tras la inicialización
    pub lpf: DlpfBandwidth,
    /// Frecuencia de muestreo inicial (Hz)
    pub sample_rate: u16,
    /// Nivel activo de la línea de interrupción
    pub interrupt_active_low: bool,
    /// Verificar cada bloque escrito en la memoria del DMP
    pub verify_firmware: bool,
    /// Intentos de lectura de FIFO_COUNT durante la carga del DMP
    pub fifo_poll_attempts: u32,
    /// Espera entre intentos (ms)
    pub fifo_poll_interval_ms: u32,
}

impl Default for Mpu6050Config {
    fn default() -> Self {
        Self {
            gyro_fullscale: GyroFullScale::Fs2000Dps,
            accel_fullscale: AccelFullScale::Fs2G,
            lpf: DlpfBandwidth::Hz42,
            sample_rate: 50,
            interrupt_active_low: true,
            verify_firmware: true,
            fifo_poll_attempts: 500,
            fifo_poll_interval_ms: 1,
        }
    }
}

impl Mpu6050Config {
    pub fn with_gyro_fullscale(mut self, fsr: GyroFullScale) -> Self {
        self.gyro_fullscale = fsr;
        self
    }

    pub fn with_accel_fullscale(mut self, fsr: AccelFullScale) -> Self {
        self.accel_fullscale = fsr;
        self
    }

    pub fn with_lpf(mut self, lpf: DlpfBandwidth) -> Self {
        self.lpf = lpf;
        self
    }

    pub fn with_sample_rate(mut self, hz: u16) -> Self {
        self.sample_rate = hz;
        self
    }

    pub fn with_interrupt_active_low(mut self, active_low: bool) -> Self {
        self.interrupt_active_low = active_low;
        self
    }

    pub fn with_firmware_verification(mut self, verify: bool) -> Self {
        self.verify_firmware = verify;
        self
    }

    /// Límite de la espera por datos en el FIFO durante la carga del DMP
    pub fn with_fifo_poll(mut self, attempts: u32, interval_ms: u32) -> Self {
        self.fifo_poll_attempts = attempts.max(1);
        self.fifo_poll_interval_ms = interval_ms;
        self
    }
}

/// Direcciones I2C posibles según el pin AD0
pub const ADDRESSES: [u8; 2] = [data_defs::ADDRESS_LOW, data_defs::ADDRESS_HIGH];
