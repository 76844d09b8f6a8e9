//! Acceso compartido al driver desde varios hilos
//!
//! Cada operación toma el cerrojo durante una sola llamada, de modo que las
//! secuencias de lectura-modificación-escritura nunca se intercalan.

use std::sync::{Arc, Mutex};

use embedded_hal::blocking::delay::DelayMs;

use crate::device::{Mpu6050, Mpu6050Error};
use crate::dmp::DmpPacket;
use crate::interface::Interface;
use crate::types::Sensors;

pub struct SharedMpu6050<I, D> {
    inner: Arc<Mutex<Mpu6050<I, D>>>,
}

impl<I, D> Clone for SharedMpu6050<I, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, D> SharedMpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    pub fn new(device: Mpu6050<I, D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Ejecuta `f` con acceso exclusivo al driver
    pub fn with<T, F>(&self, f: F) -> Result<T, Mpu6050Error>
    where
        F: FnOnce(&mut Mpu6050<I, D>) -> Result<T, Mpu6050Error>,
    {
        let mut device = self.inner.lock().map_err(|_| {
            log::error!("Mutex del MPU6050 envenenado");
            Mpu6050Error::LockPoisoned
        })?;
        f(&mut *device)
    }

    pub fn set_sensors(&self, sensors: Sensors) -> Result<(), Mpu6050Error> {
        self.with(|dev| dev.set_sensors(sensors))
    }

    pub fn set_sample_rate(&self, hz: u16) -> Result<(), Mpu6050Error> {
        self.with(|dev| dev.set_sample_rate(hz))
    }

    pub fn read_fifo_stream(&self, data: &mut [u8]) -> Result<u16, Mpu6050Error> {
        self.with(|dev| dev.read_fifo_stream(data))
    }

    pub fn read_dmp_packet(&self) -> Result<(DmpPacket, u16), Mpu6050Error> {
        self.with(|dev| dev.read_dmp_packet())
    }

    pub fn reset_fifo(&self) -> Result<(), Mpu6050Error> {
        self.with(|dev| dev.reset_fifo())
    }

    /// Recupera el driver si no quedan otras copias
    pub fn into_inner(self) -> Option<Mpu6050<I, D>> {
        Arc::try_unwrap(self.inner)
            .ok()
            .and_then(|mutex| mutex.into_inner().ok())
    }
}
