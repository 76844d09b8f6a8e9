//! Carga y control del DMP (Digital Motion Processor) del MPU6050
//!
//! La carga sigue la secuencia fija del fabricante: reset, lectura de la
//! revisión y de los offsets de fábrica, escritura de la imagen, parches de
//! configuración y los siete bloques de actualización intercalados con
//! reinicios del FIFO. Al terminar el DMP queda cargado pero desactivado.

use embedded_hal::blocking::delay::DelayMs;

use crate::conversion::Quaternion;
use crate::device::{Mpu6050, Mpu6050Error};
use crate::dmp_firmware::{DMP_CONFIG, DMP_FIRMWARE, DMP_UPDATES};
use crate::firmware::MemoryAddress;
use crate::interface::Interface;
use crate::register::{dmp, registers as reg};
use crate::types::{
    bits, data_defs, ClockSource, DlpfBandwidth, ExternalFrameSync, GyroFullScale, Sensors,
};

/// Espera tras el reset del chip (ms)
const RESET_SETTLE_MS: u32 = 50;
/// Espera tras reiniciar el maestro I2C auxiliar (ms)
const I2C_MASTER_SETTLE_MS: u32 = 50;
/// Divisor de SMPLRT_DIV durante la carga: 1 kHz / (1 + 4) = 200 Hz
const LOADER_SAMPLE_DIVIDER: u8 = 4;
/// Bytes que debe acumular el FIFO tras las actualizaciones 5 y 6
const FIFO_READY_BYTES: u16 = 3;

// Bits de USER_CTRL para las operaciones de lectura-modificación-escritura
const USER_CTRL_DMP_EN_BIT: u8 = 7;
const USER_CTRL_FIFO_EN_BIT: u8 = 6;
const USER_CTRL_DMP_RST_BIT: u8 = 3;
const USER_CTRL_FIFO_RST_BIT: u8 = 2;

/// Paquete por defecto del DMP (42 bytes)
///
/// Cuaternión en Q14 en los bytes 0, 4, 8 y 12; giroscopio en 16, 20 y 24;
/// acelerómetro en 28, 32 y 36. Todos los valores son big-endian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmpPacket {
    pub quaternion: Quaternion,
    pub quaternion_raw: [i16; 4],
    pub gyro: [i16; 3],
    pub accel: [i16; 3],
}

impl DmpPacket {
    pub fn parse(buf: &[u8]) -> Result<Self, Mpu6050Error> {
        if buf.len() < data_defs::DMP_PACKET_SIZE as usize {
            return Err(Mpu6050Error::InvalidParameter);
        }
        let word = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]);

        let quaternion_raw = [word(0), word(4), word(8), word(12)];
        Ok(Self {
            quaternion: Quaternion::from_raw(quaternion_raw),
            quaternion_raw,
            gyro: [word(16), word(20), word(24)],
            accel: [word(28), word(32), word(36)],
        })
    }
}

impl<I, D> Mpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    /// Carga la imagen y las tablas de configuración incluidas en el crate
    pub fn load_default_firmware(&mut self) -> Result<(), Mpu6050Error> {
        self.load_firmware(&DMP_FIRMWARE, &DMP_CONFIG)
    }

    /// Carga una imagen de firmware y su tabla de parches en el DMP
    ///
    /// Deja el DMP desactivado; se activa con `set_dmp_enabled(true)`.
    pub fn load_firmware(&mut self, image: &[u8], patches: &[u8]) -> Result<(), Mpu6050Error> {
        self.base_state.dmp_loaded = false;

        log::debug!("Reiniciando MPU6050");
        self.reset()?;
        self.delay_ms(RESET_SETTLE_MS);

        // Dormir, ciclo de despertar y despertar
        self.set_sleep_enabled(true)?;
        self.set_wake_cycle_enabled(true)?;
        self.set_sleep_enabled(false)?;

        let revision = self.hardware_revision()?;
        log::info!("Revisión de hardware: 0x{:02X}", revision);

        let otp_valid = self.get_otp_bank_valid()?;
        log::info!("Banco OTP {}", if otp_valid { "válido" } else { "inválido" });

        let trim = self.get_gyro_tc_offsets()?;
        log::debug!("Offsets de fábrica del giroscopio: {:?}", trim);

        // Esclavo 0 apuntando al propio dispositivo
        self.set_slave_address(0, 0x7F)?;
        self.set_i2c_master_enabled(false)?;
        let own_address = self.interface.device_address();
        self.set_slave_address(0, own_address)?;
        self.reset_i2c_master()?;
        self.delay_ms(I2C_MASTER_SETTLE_MS);

        log::debug!("Escribiendo imagen del DMP ({} bytes)", image.len());
        let verify = self.config.verify_firmware;
        self.write_memory_block(image, MemoryAddress::new(0, 0), verify)
            .map_err(|e| {
                log::error!("Fallo al escribir la imagen del DMP: {:?}", e);
                Mpu6050Error::FirmwareImageFailed
            })?;

        log::debug!("Aplicando parches de configuración ({} bytes)", patches.len());
        self.write_configuration_set(patches).map_err(|e| {
            log::error!("Fallo al aplicar los parches del DMP: {:?}", e);
            match e {
                Mpu6050Error::UnknownPatchInstruction(_) => e,
                _ => Mpu6050Error::ConfigPatchFailed,
            }
        })?;

        self.set_clock_source(ClockSource::PllGyroZ)?;
        self.set_int_enable_raw(bits::DMP_FIFO_OFLOW_INT)?;
        self.set_sample_rate_divider(LOADER_SAMPLE_DIVIDER)?;
        self.set_external_frame_sync(ExternalFrameSync::TempOutL)?;
        self.write_lpf_field(DlpfBandwidth::Hz42)?;
        self.write_gyro_fullscale_field(GyroFullScale::Fs2000Dps)?;
        self.set_dmp_config(0x03, 0x00)?;

        self.set_otp_bank_valid(false)?;
        self.set_gyro_tc_offsets(trim)?;
        self.set_gyro_user_offsets([0; 3])?;

        self.apply_update(0)?;
        self.apply_update(1)?;

        self.write_bit(reg::USER_CTRL, USER_CTRL_FIFO_RST_BIT, true)?;
        let count = self.fifo_count()?;
        self.discard_fifo(count)?;

        self.set_motion_threshold(2)?;
        self.set_zero_motion_threshold(156)?;
        self.set_motion_duration(80)?;
        self.set_zero_motion_duration(0)?;

        self.write_bit(reg::USER_CTRL, USER_CTRL_FIFO_RST_BIT, true)?;
        self.write_bit(reg::USER_CTRL, USER_CTRL_FIFO_EN_BIT, true)?;
        self.write_bit(reg::USER_CTRL, USER_CTRL_DMP_EN_BIT, true)?;
        self.write_bit(reg::USER_CTRL, USER_CTRL_DMP_RST_BIT, true)?;

        self.apply_update(2)?;
        self.apply_update(3)?;
        self.apply_update(4)?;

        let count = self.wait_for_fifo(FIFO_READY_BYTES)?;
        self.discard_fifo(count)?;
        let status = self.read_int_status()?;
        log::debug!("INT_STATUS: 0x{:02X}", status);

        self.apply_update(5)?;

        let count = self.wait_for_fifo(FIFO_READY_BYTES)?;
        self.discard_fifo(count)?;
        let status = self.read_int_status()?;
        log::debug!("INT_STATUS: 0x{:02X}", status);

        self.apply_update(6)?;

        self.write_bit(reg::USER_CTRL, USER_CTRL_DMP_EN_BIT, false)?;

        self.base_state.dmp_enabled = false;
        self.base_state.dmp_loaded = true;
        self.base_state.dmp_packet_size = data_defs::DMP_PACKET_SIZE;
        self.base_state.dmp_output_rate = dmp::DMP_SAMPLE_RATE;
        self.base_state.clock_source = Some(ClockSource::PllGyroZ);
        self.base_state.gyro_fullscale = Some(GyroFullScale::Fs2000Dps);
        self.base_state.lpf = Some(DlpfBandwidth::Hz42);
        self.base_state.sample_rate = Some(dmp::DMP_SAMPLE_RATE);

        self.write_bit(reg::USER_CTRL, USER_CTRL_FIFO_RST_BIT, true)?;
        self.read_int_status()?;

        log::info!("DMP cargado");
        Ok(())
    }

    fn apply_update(&mut self, index: usize) -> Result<(), Mpu6050Error> {
        log::debug!("Actualización de memoria {}/{}", index + 1, DMP_UPDATES.len());
        self.apply_update_block(DMP_UPDATES[index])
    }

    /// Espera a que el FIFO tenga al menos `min` bytes
    fn wait_for_fifo(&mut self, min: u16) -> Result<u16, Mpu6050Error> {
        let attempts = self.config.fifo_poll_attempts;
        let interval = self.config.fifo_poll_interval_ms;

        for _ in 0..attempts {
            let count = self.fifo_count()?;
            if count >= min {
                return Ok(count);
            }
            self.delay_ms(interval);
        }

        log::error!("El FIFO no alcanzó {} bytes tras {} intentos", min, attempts);
        Err(Mpu6050Error::DeviceUnresponsive)
    }

    /// Activa o desactiva el DMP ya cargado
    pub fn set_dmp_enabled(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        if !self.base_state.dmp_loaded {
            return Err(Mpu6050Error::InvalidState);
        }
        if self.base_state.dmp_enabled == enable {
            return Ok(());
        }

        if enable {
            self.set_interrupt_enabled(false)?;
            self.set_bypass(false)?;
            self.set_sample_rate(dmp::DMP_SAMPLE_RATE)?;
            // El DMP decide qué llega al FIFO
            self.write_byte(reg::FIFO_EN, 0)?;
            self.base_state.dmp_enabled = true;
            self.set_interrupt_enabled(true)?;
        } else {
            self.set_interrupt_enabled(false)?;
            let mask = self.base_state.fifo_enabled.unwrap_or(Sensors::empty());
            self.write_byte(reg::FIFO_EN, mask.bits())?;
            self.base_state.dmp_enabled = false;
        }

        log::debug!("DMP {}", if enable { "activado" } else { "desactivado" });
        self.reset_fifo()
    }

    pub fn is_dmp_enabled(&self) -> bool {
        self.base_state.dmp_enabled
    }

    pub fn is_dmp_loaded(&self) -> bool {
        self.base_state.dmp_loaded
    }

    /// Frecuencia de salida de paquetes del DMP (1..=200 Hz)
    ///
    /// El DMP muestrea a 200 Hz; el divisor se redondea hacia abajo.
    pub fn set_dmp_output_rate(&mut self, hz: u16) -> Result<(), Mpu6050Error> {
        if !self.base_state.dmp_loaded {
            return Err(Mpu6050Error::InvalidState);
        }
        if hz == 0 || hz > dmp::DMP_SAMPLE_RATE {
            return Err(Mpu6050Error::InvalidParameter);
        }

        let divider = dmp::DMP_SAMPLE_RATE / hz - 1;
        let verify = self.config.verify_firmware;
        self.write_memory_block(
            &divider.to_be_bytes(),
            MemoryAddress::new(dmp::D_0_22_BANK, dmp::D_0_22_OFFSET),
            verify,
        )?;
        self.base_state.dmp_output_rate = dmp::DMP_SAMPLE_RATE / (1 + divider);

        if self.base_state.dmp_enabled {
            self.reset_fifo()?;
        }
        Ok(())
    }

    pub fn get_dmp_output_rate(&self) -> u16 {
        self.base_state.dmp_output_rate
    }

    /// Tamaño del paquete que produce el DMP cargado (0 si no hay DMP)
    pub fn dmp_packet_size(&self) -> u16 {
        self.base_state.dmp_packet_size
    }

    /// Lee y decodifica un paquete del DMP
    ///
    /// Devuelve también el número de paquetes completos que quedan en el FIFO.
    pub fn read_dmp_packet(&mut self) -> Result<(DmpPacket, u16), Mpu6050Error> {
        let mut buf = [0u8; data_defs::DMP_PACKET_SIZE as usize];
        let backlog = self.read_fifo_stream(&mut buf)?;
        Ok((DmpPacket::parse(&buf)?, backlog))
    }
}
