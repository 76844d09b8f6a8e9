use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayMs;

use crate::config::Mpu6050Config;
use crate::interface::Interface;
use crate::register::registers as reg;
use crate::types::{
    bits, data_defs, AccelFullScale, ClockSource, DlpfBandwidth, GyroFullScale, Sensors,
};

// Define the device structure and enums
pub struct Mpu6050<I, D> {
    pub(crate) interface: I,
    pub(crate) base_state: BaseState,
    pub(crate) delay: D,
    pub(crate) config: Mpu6050Config,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mpu6050Error {
    /// La transacción en el bus no se completó
    InterfaceError,
    /// Operación no permitida en el estado actual (sensores apagados, DMP en el modo equivocado)
    InvalidState,
    InvalidParameter,
    /// El FIFO todavía no tiene un paquete completo
    FifoInsufficientData,
    /// Desbordamiento del FIFO; el FIFO ya se ha reiniciado
    FifoOverflow,
    /// La lectura de verificación de la memoria del DMP no coincide
    MemoryVerificationFailed { bank: u8, offset: u8 },
    /// Instrucción especial desconocida en el conjunto de parches
    UnknownPatchInstruction(u8),
    /// Registro de parche truncado
    MalformedPatchSet,
    /// Falló la escritura de la imagen del firmware DMP
    FirmwareImageFailed,
    /// Falló la aplicación del conjunto de parches del DMP
    ConfigPatchFailed,
    /// El dispositivo no produjo datos en el tiempo esperado
    DeviceUnresponsive,
    /// WHO_AM_I inesperado
    WhoAmIError(u8),
    /// Mutex envenenado en el acceso compartido
    LockPoisoned,
}

impl Mpu6050Error {
    pub fn from_error<E: Debug>(error: E) -> Self {
        log::debug!("Error de interfaz: {:?}", error);
        Mpu6050Error::InterfaceError
    }
}

/// Estado base del dispositivo MPU6050
///
/// `None` indica que el valor todavía no se ha escrito en el hardware.
#[derive(Debug, Clone)]
pub struct BaseState {
    /// Sensores alimentados. `None` = desconocido (se trata como alimentado)
    pub sensors: Option<Sensors>,
    /// Sensores que vuelcan datos al FIFO
    pub fifo_enabled: Option<Sensors>,
    pub clock_source: Option<ClockSource>,
    pub gyro_fullscale: Option<GyroFullScale>,
    pub accel_fullscale: Option<AccelFullScale>,
    pub lpf: Option<DlpfBandwidth>,
    pub sample_rate: Option<u16>,
    pub interrupt_enabled: Option<bool>,
    pub latched_interrupts: Option<bool>,
    pub bypass_enabled: Option<bool>,
    pub interrupt_active_low: bool,
    pub lp_accel_mode: bool,
    pub dmp_enabled: bool,
    pub dmp_loaded: bool,
    pub dmp_packet_size: u16,
    pub dmp_output_rate: u16,
}

impl Default for BaseState {
    fn default() -> Self {
        Self {
            sensors: None,
            fifo_enabled: None,
            clock_source: None,
            gyro_fullscale: None,
            accel_fullscale: None,
            lpf: None,
            sample_rate: None,
            interrupt_enabled: None,
            latched_interrupts: None,
            bypass_enabled: None,
            interrupt_active_low: true,
            lp_accel_mode: false,
            dmp_enabled: false,
            dmp_loaded: false,
            dmp_packet_size: 0,
            dmp_output_rate: 0,
        }
    }
}

impl<I: Clone, D: Clone> Clone for Mpu6050<I, D> {
    fn clone(&self) -> Self {
        Self {
            interface: self.interface.clone(),
            base_state: self.base_state.clone(),
            delay: self.delay.clone(),
            config: self.config.clone(),
        }
    }
}

impl<I, D> Mpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    /// Create a new instance of Mpu6050
    pub fn new(interface: I, delay: D) -> Self {
        Self::with_config(interface, delay, Mpu6050Config::default())
    }

    pub fn with_config(interface: I, delay: D, config: Mpu6050Config) -> Self {
        let base_state = BaseState {
            interrupt_active_low: config.interrupt_active_low,
            ..BaseState::default()
        };
        Self {
            interface,
            base_state,
            delay,
            config,
        }
    }

    /// Consume el driver y devuelve la interfaz y el temporizador
    pub fn release(self) -> (I, D) {
        (self.interface, self.delay)
    }

    pub fn config(&self) -> &Mpu6050Config {
        &self.config
    }

    /// Estado de configuración conocido por el driver
    pub fn state(&self) -> &BaseState {
        &self.base_state
    }

    /// Sensores alimentados (o desconocido, que cuenta como alimentado)
    pub fn sensors_powered(&self) -> bool {
        self.base_state.sensors != Some(Sensors::empty())
    }

    /// Máscara de sensores alimentados; si es desconocida se asumen todos
    pub(crate) fn powered_sensors(&self) -> Sensors {
        self.base_state.sensors.unwrap_or(Sensors::all())
    }

    pub(crate) fn compass_requested(&self) -> bool {
        self.base_state
            .sensors
            .map_or(false, |s| s.contains(Sensors::COMPASS))
    }

    pub(crate) fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Leer un registro
    pub fn read_byte(&mut self, reg: u8) -> Result<u8, Mpu6050Error> {
        let mut buf = [0u8];
        self.interface
            .read_reg(reg, &mut buf)
            .map_err(Mpu6050Error::from_error)?;
        Ok(buf[0])
    }

    /// Leer varios registros consecutivos
    pub fn read_bytes(&mut self, reg: u8, data: &mut [u8]) -> Result<(), Mpu6050Error> {
        self.interface
            .read_reg(reg, data)
            .map_err(Mpu6050Error::from_error)
    }

    /// Leer un bit de un registro
    pub fn read_bit(&mut self, reg: u8, bit: u8) -> Result<bool, Mpu6050Error> {
        Ok(self.read_bits(reg, bit, 1)? != 0)
    }

    /// Leer un campo de `length` bits cuyo bit más alto es `high_bit`
    pub fn read_bits(&mut self, reg: u8, high_bit: u8, length: u8) -> Result<u8, Mpu6050Error> {
        check_field(high_bit, length)?;
        let value = self.read_byte(reg)?;
        Ok(bits::extract(value, high_bit, length))
    }

    /// Escribir a un registro
    pub fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), Mpu6050Error> {
        self.interface
            .write_reg(reg, &[value])
            .map_err(Mpu6050Error::from_error)
    }

    pub fn write_bytes(&mut self, reg: u8, data: &[u8]) -> Result<(), Mpu6050Error> {
        self.interface
            .write_reg(reg, data)
            .map_err(Mpu6050Error::from_error)
    }

    /// Lectura-modificación-escritura de un bit. No es atómica.
    pub(crate) fn write_bit(&mut self, reg: u8, bit: u8, value: bool) -> Result<(), Mpu6050Error> {
        self.write_bits(reg, bit, 1, value as u8)
    }

    /// Lectura-modificación-escritura de un campo. No es atómica.
    pub(crate) fn write_bits(
        &mut self,
        reg: u8,
        high_bit: u8,
        length: u8,
        value: u8,
    ) -> Result<(), Mpu6050Error> {
        check_field(high_bit, length)?;
        let current = self.read_byte(reg)?;
        self.write_byte(reg, bits::merge(current, high_bit, length, value))
    }

    /// Identificador del chip (WHO_AM_I[6:1])
    pub fn device_id(&mut self) -> Result<u8, Mpu6050Error> {
        self.read_bits(reg::WHO_AM_I, bits::WHO_AM_I_BIT, bits::WHO_AM_I_LENGTH)
    }

    /// Comprueba que al otro lado del bus hay un MPU6050
    pub fn test_connection(&mut self) -> Result<bool, Mpu6050Error> {
        Ok(self.device_id()? == data_defs::WHO_AM_I_EXPECTED)
    }

    /// Reset completo del dispositivo. El estado conocido vuelve a "desconocido".
    pub fn reset(&mut self) -> Result<(), Mpu6050Error> {
        self.write_bit(reg::PWR_MGMT_1, 7, true)?;
        self.base_state = BaseState {
            interrupt_active_low: self.config.interrupt_active_low,
            ..BaseState::default()
        };
        Ok(())
    }

    /// Inicializa el dispositivo con la configuración del driver
    ///
    /// Deja el chip en reposo (sin sensores); el llamante debe activar los
    /// sensores con `set_sensors` o cargar el DMP.
    pub fn initialize(&mut self) -> Result<(), Mpu6050Error> {
        let id = self.device_id()?;
        if id != data_defs::WHO_AM_I_EXPECTED {
            log::error!("WHO_AM_I inesperado: 0x{:02X}", id);
            return Err(Mpu6050Error::WhoAmIError(id));
        }

        // Reset y despertar
        self.write_byte(reg::PWR_MGMT_1, bits::H_RESET)?;
        self.delay_ms(100);
        self.reset_tracked_state();
        self.write_byte(reg::PWR_MGMT_1, 0x00)?;

        let cfg = self.config.clone();
        self.set_gyro_fullscale(cfg.gyro_fullscale)?;
        self.set_accel_fullscale(cfg.accel_fullscale)?;
        self.set_lpf(cfg.lpf)?;
        self.set_sample_rate(cfg.sample_rate)?;

        self.configure_fifo(Sensors::empty())?;
        self.set_bypass(false)?;
        self.set_sensors(Sensors::empty())?;

        log::info!("MPU6050 inicializado (id 0x{:02X})", id);
        Ok(())
    }

    fn reset_tracked_state(&mut self) {
        self.base_state = BaseState {
            interrupt_active_low: self.config.interrupt_active_low,
            ..BaseState::default()
        };
    }
}

fn check_field(high_bit: u8, length: u8) -> Result<(), Mpu6050Error> {
    if high_bit > 7 || length == 0 || length > high_bit + 1 {
        return Err(Mpu6050Error::InvalidParameter);
    }
    Ok(())
}
