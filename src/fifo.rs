//! Implementación para manejar el FIFO del MPU6050
//!
//! Este módulo configura qué sensores vuelcan datos al FIFO, reinicia el
//! flujo tras un desbordamiento y lee paquetes de tamaño fijo con el número
//! de paquetes pendientes.

use embedded_hal::blocking::delay::DelayMs;

use crate::device::{Mpu6050, Mpu6050Error};
use crate::interface::Interface;
use crate::register::registers as reg;
use crate::types::{bits, data_defs, Sensors};

/// Espera tras el reset del FIFO (ms)
const FIFO_RESET_SETTLE_MS: u32 = 50;
/// Espera tras el reset conjunto de FIFO y DMP (ms)
const DMP_RESET_SETTLE_MS: u32 = 100;

/// Resultado de `configure_fifo`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoConfigOutcome {
    /// Todos los sensores pedidos vuelcan datos al FIFO
    Complete,
    /// Algunos sensores pedidos están apagados y se han descartado
    Partial { effective: Sensors },
}

impl<I, D> Mpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    /// Selecciona los sensores que vuelcan datos al FIFO
    ///
    /// Solo se habilitan los sensores que estén alimentados. Con el DMP activo
    /// no hace nada: el DMP decide el contenido del FIFO.
    pub fn configure_fifo(&mut self, sensors: Sensors) -> Result<FifoConfigOutcome, Mpu6050Error> {
        if self.base_state.dmp_enabled {
            return Ok(FifoConfigOutcome::Complete);
        }
        if !self.sensors_powered() {
            return Err(Mpu6050Error::InvalidState);
        }

        let prev = self.base_state.fifo_enabled;
        let effective = sensors & self.powered_sensors();
        self.base_state.fifo_enabled = Some(effective);

        let outcome = if effective != sensors {
            log::warn!(
                "FIFO parcial: pedidos {:?}, alimentados {:?}",
                sensors,
                effective
            );
            FifoConfigOutcome::Partial { effective }
        } else {
            FifoConfigOutcome::Complete
        };

        let interrupt = !sensors.is_empty() || self.base_state.lp_accel_mode;
        if let Err(e) = self.set_interrupt_enabled(interrupt) {
            self.base_state.fifo_enabled = prev;
            return Err(e);
        }

        if !sensors.is_empty() {
            if let Err(e) = self.reset_fifo() {
                self.base_state.fifo_enabled = prev;
                return Err(e);
            }
        }

        Ok(outcome)
    }

    /// Sensores que vuelcan datos al FIFO
    pub fn get_fifo_config(&self) -> Option<Sensors> {
        self.base_state.fifo_enabled
    }

    /// Bytes disponibles en el FIFO
    pub fn fifo_count(&mut self) -> Result<u16, Mpu6050Error> {
        let mut count = [0u8; 2];
        self.read_bytes(reg::FIFO_COUNTH, &mut count)?;
        Ok(u16::from_be_bytes(count))
    }

    /// Lee bytes del FIFO sin comprobar el contador
    pub fn read_fifo(&mut self, data: &mut [u8]) -> Result<(), Mpu6050Error> {
        if data.is_empty() {
            return Ok(());
        }
        self.read_bytes(reg::FIFO_R_W, data)
    }

    /// Descarta `count` bytes del FIFO
    pub(crate) fn discard_fifo(&mut self, count: u16) -> Result<(), Mpu6050Error> {
        let mut scratch = [0u8; 64];
        let mut remaining = count as usize;
        while remaining > 0 {
            let n = remaining.min(scratch.len());
            self.read_fifo(&mut scratch[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Lee un paquete completo del FIFO del DMP
    ///
    /// El tamaño del paquete es `data.len()`. Devuelve el número de paquetes
    /// completos que siguen en el FIFO. Si se detecta desbordamiento el FIFO
    /// se reinicia y se devuelve `FifoOverflow`.
    pub fn read_fifo_stream(&mut self, data: &mut [u8]) -> Result<u16, Mpu6050Error> {
        if !self.base_state.dmp_enabled || !self.sensors_powered() {
            return Err(Mpu6050Error::InvalidState);
        }
        if data.is_empty() {
            return Err(Mpu6050Error::InvalidParameter);
        }

        let length = data.len();
        let count = self.fifo_count()?;
        if (count as usize) < length {
            return Err(Mpu6050Error::FifoInsufficientData);
        }

        if count > (data_defs::MAX_FIFO >> 1) {
            // FIFO al 50%: comprobar el bit de desbordamiento
            let status = self.read_int_status()?;
            if status & bits::FIFO_OFLOW_INT != 0 {
                log::warn!("Desbordamiento del FIFO ({} bytes), reiniciando", count);
                self.reset_fifo()?;
                return Err(Mpu6050Error::FifoOverflow);
            }
        }

        self.read_fifo(data)?;
        Ok((count as usize / length - 1) as u16)
    }

    /// Reinicia el FIFO y restaura la configuración de volcado
    pub fn reset_fifo(&mut self) -> Result<(), Mpu6050Error> {
        if !self.sensors_powered() {
            return Err(Mpu6050Error::InvalidState);
        }

        self.write_byte(reg::INT_ENABLE, 0)?;
        self.write_byte(reg::FIFO_EN, 0)?;
        self.write_byte(reg::USER_CTRL, 0)?;

        let interrupt = self.base_state.interrupt_enabled.unwrap_or(false);

        if self.base_state.dmp_enabled {
            self.write_byte(reg::USER_CTRL, bits::FIFO_RST | bits::DMP_RST)?;
            self.delay_ms(DMP_RESET_SETTLE_MS);

            let mut user_ctrl = bits::FIFO_EN | bits::DMP_EN;
            if self.compass_requested() {
                user_ctrl |= bits::I2C_MST_EN;
            }
            self.write_byte(reg::USER_CTRL, user_ctrl)?;

            let int_enable = if interrupt { bits::DMP_INT_EN } else { 0 };
            self.write_byte(reg::INT_ENABLE, int_enable)?;
            // Con el DMP los sensores no se vuelcan directamente al FIFO
            self.write_byte(reg::FIFO_EN, 0)?;
        } else {
            self.write_byte(reg::USER_CTRL, bits::FIFO_RST)?;

            let mut user_ctrl = bits::FIFO_EN;
            let bypass = self.base_state.bypass_enabled.unwrap_or(false);
            if self.compass_requested() && !bypass {
                user_ctrl |= bits::I2C_MST_EN;
            }
            self.write_byte(reg::USER_CTRL, user_ctrl)?;
            self.delay_ms(FIFO_RESET_SETTLE_MS);

            let int_enable = if interrupt { bits::DATA_RDY_EN } else { 0 };
            self.write_byte(reg::INT_ENABLE, int_enable)?;

            let mask = self.base_state.fifo_enabled.unwrap_or(Sensors::empty());
            self.write_byte(reg::FIFO_EN, mask.bits())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::mock::{powered_device, Op};

    fn writes(log: &[Op]) -> Vec<(u8, u8)> {
        log.iter()
            .filter_map(|op| match op {
                Op::Write(r, data) => Some((*r, data[0])),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_configure_fifo_partial() {
        let (mut dev, mock) = powered_device(Sensors::GYRO_X | Sensors::ACCEL);

        let outcome = dev.configure_fifo(Sensors::GYRO | Sensors::ACCEL).unwrap();

        let effective = Sensors::GYRO_X | Sensors::ACCEL;
        assert_eq!(outcome, FifoConfigOutcome::Partial { effective });
        assert_eq!(dev.get_fifo_config(), Some(effective));
        assert_eq!(mock.reg(reg::FIFO_EN), 0x48);
        assert_eq!(mock.reg(reg::INT_ENABLE), bits::DATA_RDY_EN);
        assert_eq!(mock.reg(reg::USER_CTRL), bits::FIFO_EN);
    }

    #[test]
    fn test_configure_fifo_complete() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        let outcome = dev.configure_fifo(Sensors::GYRO_Z | Sensors::ACCEL).unwrap();
        assert_eq!(outcome, FifoConfigOutcome::Complete);
        assert_eq!(mock.reg(reg::FIFO_EN), 0x18);

        // Vaciar la máscara desactiva la interrupción sin reiniciar el FIFO
        mock.clear_log();
        assert_eq!(
            dev.configure_fifo(Sensors::empty()).unwrap(),
            FifoConfigOutcome::Complete
        );
        assert_eq!(mock.byte_writes_to(reg::INT_ENABLE), vec![0]);
        assert!(mock.writes_to(reg::USER_CTRL).is_empty());
    }

    #[test]
    fn test_configure_fifo_requires_power() {
        let (mut dev, mock) = powered_device(Sensors::empty());
        assert_eq!(
            dev.configure_fifo(Sensors::ACCEL),
            Err(Mpu6050Error::InvalidState)
        );
        assert!(mock.log().is_empty());

        // Con el DMP activo no se toca nada
        dev.base_state.dmp_enabled = true;
        assert_eq!(
            dev.configure_fifo(Sensors::ACCEL),
            Ok(FifoConfigOutcome::Complete)
        );
    }

    #[test]
    fn test_configure_fifo_rolls_back_on_reset_failure() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.configure_fifo(Sensors::ACCEL).unwrap();

        mock.state().fail_write_reg = Some(reg::USER_CTRL);
        assert_eq!(
            dev.configure_fifo(Sensors::GYRO),
            Err(Mpu6050Error::InterfaceError)
        );
        assert_eq!(dev.get_fifo_config(), Some(Sensors::ACCEL));
    }

    #[test]
    fn test_reset_sequence_without_dmp() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL | Sensors::COMPASS);
        dev.base_state.fifo_enabled = Some(Sensors::ACCEL);
        dev.base_state.interrupt_enabled = Some(true);
        dev.base_state.bypass_enabled = Some(false);

        dev.reset_fifo().unwrap();

        assert_eq!(
            writes(&mock.log()),
            vec![
                (reg::INT_ENABLE, 0),
                (reg::FIFO_EN, 0),
                (reg::USER_CTRL, 0),
                (reg::USER_CTRL, bits::FIFO_RST),
                (reg::USER_CTRL, bits::FIFO_EN | bits::I2C_MST_EN),
                (reg::INT_ENABLE, bits::DATA_RDY_EN),
                (reg::FIFO_EN, Sensors::ACCEL.bits()),
            ]
        );
    }

    #[test]
    fn test_reset_sequence_with_dmp() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.base_state.dmp_enabled = true;
        dev.base_state.interrupt_enabled = Some(true);
        dev.base_state.fifo_enabled = Some(Sensors::GYRO);

        dev.reset_fifo().unwrap();

        assert_eq!(
            writes(&mock.log()),
            vec![
                (reg::INT_ENABLE, 0),
                (reg::FIFO_EN, 0),
                (reg::USER_CTRL, 0),
                (reg::USER_CTRL, bits::FIFO_RST | bits::DMP_RST),
                (reg::USER_CTRL, bits::FIFO_EN | bits::DMP_EN),
                (reg::INT_ENABLE, bits::DMP_INT_EN),
                (reg::FIFO_EN, 0),
            ]
        );
    }

    #[test]
    fn test_reset_requires_power() {
        let (mut dev, _mock) = powered_device(Sensors::empty());
        assert_eq!(dev.reset_fifo(), Err(Mpu6050Error::InvalidState));
    }

    #[test]
    fn test_stream_requires_dmp() {
        let (mut dev, mock) = powered_device(Sensors::GYRO);
        let mut packet = [0u8; 42];
        assert_eq!(dev.read_fifo_stream(&mut packet), Err(Mpu6050Error::InvalidState));
        assert!(mock.log().is_empty());
    }

    #[test]
    fn test_stream_insufficient_data() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.base_state.dmp_enabled = true;
        mock.push_fifo(&[0xAA; 41]);

        let mut packet = [0u8; 42];
        assert_eq!(
            dev.read_fifo_stream(&mut packet),
            Err(Mpu6050Error::FifoInsufficientData)
        );
        assert!(!mock.was_read(reg::FIFO_R_W));
        assert_eq!(mock.state().fifo.len(), 41);
    }

    #[test]
    fn test_stream_backlog() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.base_state.dmp_enabled = true;
        let data: Vec<u8> = (0..(42 * 3 + 5)).map(|i| i as u8).collect();
        mock.push_fifo(&data);

        let mut packet = [0u8; 42];
        assert_eq!(dev.read_fifo_stream(&mut packet), Ok(2));
        assert_eq!(&packet[..], &data[..42]);
        assert_eq!(dev.read_fifo_stream(&mut packet), Ok(1));
        assert_eq!(&packet[..], &data[42..84]);
        assert!(!mock.was_read(reg::INT_STATUS));
    }

    #[test]
    fn test_stream_overflow_resets_fifo() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.base_state.dmp_enabled = true;
        dev.base_state.fifo_enabled = Some(Sensors::GYRO);
        mock.push_fifo(&[0u8; 600]);
        mock.set_reg(reg::INT_STATUS, bits::FIFO_OFLOW_INT);

        let mut packet = [0u8; 42];
        assert_eq!(dev.read_fifo_stream(&mut packet), Err(Mpu6050Error::FifoOverflow));

        assert!(mock.state().fifo.is_empty());
        assert!(!mock.was_read(reg::FIFO_R_W));
        assert_eq!(mock.reg(reg::USER_CTRL), bits::FIFO_EN | bits::DMP_EN);
        assert_eq!(dev.get_fifo_config(), Some(Sensors::GYRO));
    }

    #[test]
    fn test_stream_half_full_without_overflow() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.base_state.dmp_enabled = true;
        mock.push_fifo(&[0x11; 42 * 13]);

        let mut packet = [0u8; 42];
        assert_eq!(dev.read_fifo_stream(&mut packet), Ok(12));
        assert!(mock.was_read(reg::INT_STATUS));
        assert_eq!(packet, [0x11; 42]);
    }
}
