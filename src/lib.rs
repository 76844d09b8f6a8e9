//! Biblioteca Rust para el sensor de movimiento InvenSense MPU6050
//!
//! Esta biblioteca proporciona una interfaz para controlar el sensor MPU6050,
//! un IMU de 6 ejes con giroscopio y acelerómetro, y para cargar y usar el
//! firmware de su procesador de movimiento (DMP).

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

// Importaciones internas
pub mod config;
pub mod controls;
pub mod conversion;
pub mod device;
pub mod dmp;
pub mod dmp_firmware;
pub mod fifo;
pub mod firmware;
pub mod interface;
pub mod register;
pub mod shared;
pub mod types;

// Re-exports públicos
pub use config::Mpu6050Config;
pub use controls::Motion6;
pub use conversion::{accel_raw_to_g, gyro_raw_to_dps, temp_raw_to_celsius, Quaternion};
pub use device::{Mpu6050, Mpu6050Error};
pub use dmp::DmpPacket;
pub use fifo::FifoConfigOutcome;
pub use firmware::MemoryAddress;
pub use shared::SharedMpu6050;
pub use types::{AccelFullScale, ClockSource, DlpfBandwidth, GyroFullScale, Sensors};

use crate::interface::I2cInterface;

/// Crea un nuevo dispositivo MPU6050 usando el bus I2C
pub fn new_i2c_device<I, D, E>(i2c: I, address: u8, delay: D) -> Mpu6050<I2cInterface<I>, D>
where
    I: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    E: core::fmt::Debug,
    D: DelayMs<u32>,
{
    let interface = I2cInterface::new(i2c, address);
    Mpu6050::new(interface, delay)
}

/// Crea un dispositivo MPU6050 sobre un bus I2C de Linux (`/dev/i2c-N`)
#[cfg(feature = "linux")]
pub fn new_linux_device(
    path: &str,
    address: u8,
) -> Result<Mpu6050<I2cInterface<linux_embedded_hal::I2cdev>, linux_embedded_hal::Delay>, Mpu6050Error>
{
    let i2c = linux_embedded_hal::I2cdev::new(path).map_err(Mpu6050Error::from_error)?;
    Ok(new_i2c_device(i2c, address, linux_embedded_hal::Delay))
}
