//! Controles de energía y configuración del MPU6050
//!
//! Cada setter compara con el estado conocido del driver antes de tocar el
//! hardware; los cambios de configuración con los sensores apagados se ignoran.

use embedded_hal::blocking::delay::DelayMs;

use crate::device::{Mpu6050, Mpu6050Error};
use crate::interface::Interface;
use crate::register::registers as reg;
use crate::types::{
    bits, AccelFullScale, ClockSource, DlpfBandwidth, ExternalFrameSync, GyroFullScale, Sensors,
};

/// Frecuencia base del muestreo con el DLPF activo (Hz)
pub const MPU6050_BASE_SAMPLE_RATE: u16 = 1000;

/// Tiempo de estabilización tras cambiar la alimentación de los sensores (ms)
const SENSOR_SETTLE_MS: u32 = 50;
/// Tiempo de estabilización del maestro I2C auxiliar (ms)
const AUX_I2C_SETTLE_MS: u32 = 3;

/// Lectura cruda de acelerómetro y giroscopio
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Motion6 {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl<I, D> Mpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    /// Alimenta los sensores de `sensors` y pone el resto en standby
    ///
    /// Si falla cualquiera de las dos escrituras el driver pasa a considerar
    /// que no hay sensores alimentados.
    pub fn set_sensors(&mut self, sensors: Sensors) -> Result<(), Mpu6050Error> {
        let (pwr_mgmt_1, clock) = if sensors.intersects(Sensors::GYRO) {
            (ClockSource::PllGyroX as u8, ClockSource::PllGyroX)
        } else if !sensors.is_empty() {
            (ClockSource::Internal as u8, ClockSource::Internal)
        } else {
            (bits::SLEEP, ClockSource::Internal)
        };

        if let Err(e) = self.write_byte(reg::PWR_MGMT_1, pwr_mgmt_1) {
            self.track_powered_sensors(Sensors::empty());
            return Err(e);
        }
        self.base_state.clock_source = Some(clock);

        let mut pwr_mgmt_2 = 0u8;
        if !sensors.contains(Sensors::GYRO_X) {
            pwr_mgmt_2 |= bits::STBY_XG;
        }
        if !sensors.contains(Sensors::GYRO_Y) {
            pwr_mgmt_2 |= bits::STBY_YG;
        }
        if !sensors.contains(Sensors::GYRO_Z) {
            pwr_mgmt_2 |= bits::STBY_ZG;
        }
        if !sensors.contains(Sensors::ACCEL) {
            pwr_mgmt_2 |= bits::PWR_ACCEL_STBY;
        }

        if let Err(e) = self.write_byte(reg::PWR_MGMT_2, pwr_mgmt_2) {
            self.track_powered_sensors(Sensors::empty());
            return Err(e);
        }

        // El hardware ya tiene la nueva máscara
        self.track_powered_sensors(sensors);
        self.base_state.lp_accel_mode = false;

        if !sensors.is_empty() && sensors != Sensors::ACCEL {
            // Las interrupciones con latch solo se usan en modo acelerómetro de bajo consumo
            self.set_latched_interrupts(false)?;
        }

        self.delay_ms(SENSOR_SETTLE_MS);
        Ok(())
    }

    /// Actualiza la máscara de sensores alimentados; el FIFO nunca puede
    /// contener sensores apagados
    fn track_powered_sensors(&mut self, sensors: Sensors) {
        self.base_state.sensors = Some(sensors);
        self.base_state.fifo_enabled = if sensors.is_empty() {
            Some(Sensors::empty())
        } else {
            self.base_state.fifo_enabled.map(|m| m & sensors)
        };
    }

    pub fn get_sensors(&self) -> Option<Sensors> {
        self.base_state.sensors
    }

    /// Frecuencia de muestreo en Hz (4..=1000)
    ///
    /// Ajusta también el filtro paso bajo a la mitad de la frecuencia obtenida.
    pub fn set_sample_rate(&mut self, hz: u16) -> Result<(), Mpu6050Error> {
        if !self.sensors_powered() || self.base_state.dmp_enabled {
            return Ok(());
        }

        if self.base_state.lp_accel_mode {
            if (1..=40).contains(&hz) {
                return self.set_low_power_accel_mode(hz);
            }
            // Fuera del rango del modo de bajo consumo: volver al modo normal
            self.set_low_power_accel_mode(0)?;
        }

        let hz = hz.clamp(4, MPU6050_BASE_SAMPLE_RATE);
        let divider = (MPU6050_BASE_SAMPLE_RATE / hz - 1) as u8;
        self.write_byte(reg::SMPLRT_DIV, divider)?;

        let achieved = MPU6050_BASE_SAMPLE_RATE / (1 + divider as u16);
        self.base_state.sample_rate = Some(achieved);

        self.set_lpf(DlpfBandwidth::for_rate(achieved >> 1))
    }

    /// Frecuencia de muestreo realmente configurada
    pub fn get_sample_rate(&self) -> Option<u16> {
        self.base_state.sample_rate
    }

    pub fn set_gyro_fullscale(&mut self, fsr: GyroFullScale) -> Result<(), Mpu6050Error> {
        if !self.sensors_powered() || self.base_state.gyro_fullscale == Some(fsr) {
            return Ok(());
        }
        self.write_byte(reg::GYRO_CONFIG, (fsr as u8) << bits::FS_SEL_SHIFT)?;
        self.base_state.gyro_fullscale = Some(fsr);
        Ok(())
    }

    pub fn set_accel_fullscale(&mut self, fsr: AccelFullScale) -> Result<(), Mpu6050Error> {
        if !self.sensors_powered() || self.base_state.accel_fullscale == Some(fsr) {
            return Ok(());
        }
        self.write_byte(reg::ACCEL_CONFIG, (fsr as u8) << bits::FS_SEL_SHIFT)?;
        self.base_state.accel_fullscale = Some(fsr);
        Ok(())
    }

    pub fn set_lpf(&mut self, lpf: DlpfBandwidth) -> Result<(), Mpu6050Error> {
        if !self.sensors_powered() || self.base_state.lpf == Some(lpf) {
            return Ok(());
        }
        self.write_byte(reg::CONFIG, lpf as u8)?;
        self.base_state.lpf = Some(lpf);
        Ok(())
    }

    /// Escala del giroscopio leída del hardware
    pub fn get_gyro_fullscale(&mut self) -> Result<GyroFullScale, Mpu6050Error> {
        let value = self.read_bits(reg::GYRO_CONFIG, bits::FS_SEL_BIT, bits::FS_SEL_LENGTH)?;
        Ok(GyroFullScale::from(value))
    }

    /// Escala del acelerómetro leída del hardware
    pub fn get_accel_fullscale(&mut self) -> Result<AccelFullScale, Mpu6050Error> {
        let value = self.read_bits(reg::ACCEL_CONFIG, bits::FS_SEL_BIT, bits::FS_SEL_LENGTH)?;
        Ok(AccelFullScale::from(value))
    }

    /// Filtro paso bajo leído del hardware
    pub fn get_lpf(&mut self) -> Result<DlpfBandwidth, Mpu6050Error> {
        let value = self.read_bits(reg::CONFIG, bits::DLPF_CFG_BIT, bits::DLPF_CFG_LENGTH)?;
        DlpfBandwidth::from_bits(value).ok_or(Mpu6050Error::InvalidParameter)
    }

    /// Valor de INT_PIN_CFG a partir del estado conocido
    fn int_pin_cfg(&self, latched: bool, bypass: bool) -> u8 {
        let mut value = 0;
        if latched {
            value |= bits::LATCH_INT_EN | bits::INT_ANYRD_2CLEAR;
        }
        if bypass {
            value |= bits::I2C_BYPASS_EN;
        }
        if self.base_state.interrupt_active_low {
            value |= bits::INT_LEVEL;
        }
        value
    }

    /// Interrupciones con latch (se limpian con cualquier lectura)
    pub fn set_latched_interrupts(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        if self.base_state.latched_interrupts == Some(enable) {
            return Ok(());
        }
        let bypass = self.base_state.bypass_enabled.unwrap_or(false);
        self.write_byte(reg::INT_PIN_CFG, self.int_pin_cfg(enable, bypass))?;
        self.base_state.latched_interrupts = Some(enable);
        Ok(())
    }

    /// Nivel activo de la línea de interrupción
    pub fn set_interrupt_active_low(&mut self, active_low: bool) -> Result<(), Mpu6050Error> {
        if self.base_state.interrupt_active_low == active_low {
            return Ok(());
        }
        let latched = self.base_state.latched_interrupts.unwrap_or(false);
        let bypass = self.base_state.bypass_enabled.unwrap_or(false);
        self.base_state.interrupt_active_low = active_low;
        let value = self.int_pin_cfg(latched, bypass);
        if let Err(e) = self.write_byte(reg::INT_PIN_CFG, value) {
            self.base_state.interrupt_active_low = !active_low;
            return Err(e);
        }
        Ok(())
    }

    /// Habilita la interrupción de datos listos (o la del DMP si está activo)
    pub fn set_interrupt_enabled(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        if self.base_state.dmp_enabled {
            let value = if enable { bits::DMP_INT_EN } else { 0 };
            self.write_byte(reg::INT_ENABLE, value)?;
        } else {
            if !self.sensors_powered() {
                return Ok(());
            }
            if enable && self.base_state.interrupt_enabled == Some(true) {
                return Ok(());
            }
            let value = if enable { bits::DATA_RDY_EN } else { 0 };
            self.write_byte(reg::INT_ENABLE, value)?;
        }
        self.base_state.interrupt_enabled = Some(enable);
        Ok(())
    }

    pub fn is_interrupt_enabled(&self) -> bool {
        self.base_state.interrupt_enabled.unwrap_or(false)
    }

    /// Conecta el bus auxiliar directamente al bus principal
    pub fn set_bypass(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        if self.base_state.bypass_enabled == Some(enable) {
            return Ok(());
        }

        let mut user_ctrl = self.read_byte(reg::USER_CTRL)?;
        if !enable && self.compass_requested() {
            // El maestro I2C interno gestiona la brújula
            user_ctrl |= bits::I2C_MST_EN;
        } else {
            user_ctrl &= !bits::I2C_MST_EN;
        }
        self.write_byte(reg::USER_CTRL, user_ctrl)?;
        self.delay_ms(AUX_I2C_SETTLE_MS);

        let latched = self.base_state.latched_interrupts.unwrap_or(false);
        self.write_byte(reg::INT_PIN_CFG, self.int_pin_cfg(latched, enable))?;

        self.base_state.bypass_enabled = Some(enable);
        Ok(())
    }

    pub fn is_bypass_enabled(&self) -> bool {
        self.base_state.bypass_enabled.unwrap_or(false)
    }

    /// Modo acelerómetro de bajo consumo
    ///
    /// `rate` en Hz: 0 sale del modo; 1, 5, 20 o 40 seleccionan la frecuencia
    /// de despertar (se redondea hacia arriba). Solo queda alimentado el acelerómetro.
    pub fn set_low_power_accel_mode(&mut self, rate: u16) -> Result<(), Mpu6050Error> {
        if rate > 40 {
            return Err(Mpu6050Error::InvalidParameter);
        }

        if rate == 0 {
            self.set_latched_interrupts(false)?;
            self.write_bytes(reg::PWR_MGMT_1, &[0x00, bits::PWR_GYRO_STBY])?;
            self.base_state.lp_accel_mode = false;
            return Ok(());
        }

        self.set_latched_interrupts(true)?;
        let (wake_ctrl, lpf) = match rate {
            1 => (0u8, DlpfBandwidth::Hz5),
            2..=5 => (1, DlpfBandwidth::Hz5),
            6..=20 => (2, DlpfBandwidth::Hz10),
            _ => (3, DlpfBandwidth::Hz20),
        };
        self.set_lpf(lpf)?;

        let pwr_mgmt_2 = (wake_ctrl << bits::LP_WAKE_CTRL_SHIFT) | bits::PWR_GYRO_STBY;
        self.write_bytes(reg::PWR_MGMT_1, &[bits::CYCLE, pwr_mgmt_2])?;

        self.track_powered_sensors(Sensors::ACCEL);
        self.base_state.clock_source = Some(ClockSource::Internal);
        self.base_state.lp_accel_mode = true;
        self.configure_fifo(Sensors::empty())?;
        Ok(())
    }

    pub fn is_low_power_accel_mode(&self) -> bool {
        self.base_state.lp_accel_mode
    }

    /// Lee aceleración y velocidad angular en crudo en una sola transacción
    pub fn read_motion6(&mut self) -> Result<Motion6, Mpu6050Error> {
        let mut raw = [0u8; 14];
        self.read_bytes(reg::ACCEL_XOUT_H, &mut raw)?;

        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);
        Ok(Motion6 {
            accel: [word(0), word(2), word(4)],
            gyro: [word(8), word(10), word(12)],
        })
    }

    /// Temperatura en crudo
    pub fn read_temperature_raw(&mut self) -> Result<i16, Mpu6050Error> {
        let mut raw = [0u8; 2];
        self.read_bytes(reg::TEMP_OUT_H, &mut raw)?;
        Ok(i16::from_be_bytes(raw))
    }
}

/// Acceso directo a registros usados por la secuencia de carga del DMP
impl<I, D> Mpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    pub fn set_clock_source(&mut self, source: ClockSource) -> Result<(), Mpu6050Error> {
        self.write_bits(
            reg::PWR_MGMT_1,
            bits::CLKSEL_BIT,
            bits::CLKSEL_LENGTH,
            source as u8,
        )?;
        self.base_state.clock_source = Some(source);
        Ok(())
    }

    pub fn get_clock_source(&mut self) -> Result<ClockSource, Mpu6050Error> {
        let value = self.read_bits(reg::PWR_MGMT_1, bits::CLKSEL_BIT, bits::CLKSEL_LENGTH)?;
        ClockSource::from_bits(value).ok_or(Mpu6050Error::InvalidParameter)
    }

    pub fn set_sleep_enabled(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        self.write_bit(reg::PWR_MGMT_1, 6, enable)
    }

    pub fn set_wake_cycle_enabled(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        self.write_bit(reg::PWR_MGMT_1, 5, enable)
    }

    /// Escribe SMPLRT_DIV sin pasar por la máquina de estados
    pub fn set_sample_rate_divider(&mut self, divider: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::SMPLRT_DIV, divider)?;
        self.base_state.sample_rate = Some(MPU6050_BASE_SAMPLE_RATE / (1 + divider as u16));
        Ok(())
    }

    pub fn set_external_frame_sync(&mut self, sync: ExternalFrameSync) -> Result<(), Mpu6050Error> {
        self.write_bits(
            reg::CONFIG,
            bits::EXT_SYNC_SET_BIT,
            bits::EXT_SYNC_SET_LENGTH,
            sync as u8,
        )
    }

    pub fn get_external_frame_sync(&mut self) -> Result<ExternalFrameSync, Mpu6050Error> {
        let value = self.read_bits(reg::CONFIG, bits::EXT_SYNC_SET_BIT, bits::EXT_SYNC_SET_LENGTH)?;
        Ok(ExternalFrameSync::from(value))
    }

    /// Escribe el campo DLPF_CFG conservando EXT_SYNC_SET
    pub fn write_lpf_field(&mut self, lpf: DlpfBandwidth) -> Result<(), Mpu6050Error> {
        self.write_bits(reg::CONFIG, bits::DLPF_CFG_BIT, bits::DLPF_CFG_LENGTH, lpf as u8)?;
        self.base_state.lpf = Some(lpf);
        Ok(())
    }

    /// Escribe el campo FS_SEL del giroscopio conservando los bits de autotest
    pub fn write_gyro_fullscale_field(&mut self, fsr: GyroFullScale) -> Result<(), Mpu6050Error> {
        self.write_bits(reg::GYRO_CONFIG, bits::FS_SEL_BIT, bits::FS_SEL_LENGTH, fsr as u8)?;
        self.base_state.gyro_fullscale = Some(fsr);
        Ok(())
    }

    pub fn set_motion_threshold(&mut self, threshold: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::MOT_THR, threshold)
    }

    pub fn set_motion_duration(&mut self, duration: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::MOT_DUR, duration)
    }

    pub fn set_zero_motion_threshold(&mut self, threshold: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::ZRMOT_THR, threshold)
    }

    pub fn set_zero_motion_duration(&mut self, duration: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::ZRMOT_DUR, duration)
    }

    /// Offsets de compensación térmica de fábrica (XG/YG/ZG_OFFS_TC[6:1])
    pub fn get_gyro_tc_offsets(&mut self) -> Result<[u8; 3], Mpu6050Error> {
        let mut offsets = [0u8; 3];
        for (i, r) in [reg::XG_OFFS_TC, reg::YG_OFFS_TC, reg::ZG_OFFS_TC].into_iter().enumerate() {
            offsets[i] = self.read_bits(r, bits::OFFS_TC_BIT, bits::OFFS_TC_LENGTH)?;
        }
        Ok(offsets)
    }

    pub fn set_gyro_tc_offsets(&mut self, offsets: [u8; 3]) -> Result<(), Mpu6050Error> {
        for (r, value) in [reg::XG_OFFS_TC, reg::YG_OFFS_TC, reg::ZG_OFFS_TC].into_iter().zip(offsets) {
            self.write_bits(r, bits::OFFS_TC_BIT, bits::OFFS_TC_LENGTH, value)?;
        }
        Ok(())
    }

    /// Offsets de usuario del giroscopio (XG/YG/ZG_OFFS_USR)
    pub fn set_gyro_user_offsets(&mut self, offsets: [i16; 3]) -> Result<(), Mpu6050Error> {
        for (r, value) in [reg::XG_OFFS_USR, reg::YG_OFFS_USR, reg::ZG_OFFS_USR].into_iter().zip(offsets) {
            self.write_bytes(r, &value.to_be_bytes())?;
        }
        Ok(())
    }

    pub fn get_gyro_user_offsets(&mut self) -> Result<[i16; 3], Mpu6050Error> {
        let mut offsets = [0i16; 3];
        for (i, r) in [reg::XG_OFFS_USR, reg::YG_OFFS_USR, reg::ZG_OFFS_USR].into_iter().enumerate() {
            let mut raw = [0u8; 2];
            self.read_bytes(r, &mut raw)?;
            offsets[i] = i16::from_be_bytes(raw);
        }
        Ok(offsets)
    }

    /// Bit no documentado OTP_BNK_VLD (bit 0 de XG_OFFS_TC)
    pub fn get_otp_bank_valid(&mut self) -> Result<bool, Mpu6050Error> {
        self.read_bit(reg::XG_OFFS_TC, bits::OTP_BNK_VLD_BIT)
    }

    pub fn set_otp_bank_valid(&mut self, valid: bool) -> Result<(), Mpu6050Error> {
        self.write_bit(reg::XG_OFFS_TC, bits::OTP_BNK_VLD_BIT, valid)
    }

    /// Dirección del esclavo `slave` (0-3) del maestro I2C auxiliar
    pub fn set_slave_address(&mut self, slave: u8, address: u8) -> Result<(), Mpu6050Error> {
        if slave > 3 {
            return Err(Mpu6050Error::InvalidParameter);
        }
        self.write_byte(reg::I2C_SLV0_ADDR + slave * 3, address)
    }

    pub fn get_slave_address(&mut self, slave: u8) -> Result<u8, Mpu6050Error> {
        if slave > 3 {
            return Err(Mpu6050Error::InvalidParameter);
        }
        self.read_byte(reg::I2C_SLV0_ADDR + slave * 3)
    }

    pub fn set_i2c_master_enabled(&mut self, enable: bool) -> Result<(), Mpu6050Error> {
        self.write_bit(reg::USER_CTRL, 5, enable)
    }

    /// Reinicia el maestro I2C auxiliar (el bit se limpia solo)
    pub fn reset_i2c_master(&mut self) -> Result<(), Mpu6050Error> {
        self.write_bit(reg::USER_CTRL, 1, true)
    }

    pub fn set_dmp_config(&mut self, cfg1: u8, cfg2: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::DMP_CFG_1, cfg1)?;
        self.write_byte(reg::DMP_CFG_2, cfg2)
    }

    pub fn read_int_status(&mut self) -> Result<u8, Mpu6050Error> {
        self.read_byte(reg::INT_STATUS)
    }

    pub fn set_int_enable_raw(&mut self, value: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::INT_ENABLE, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::mock::{new_device, powered_device, MockInterface};
    use embedded_hal_mock::delay::MockNoop;

    #[test]
    fn test_set_sensors_standby_bits_for_every_mask() {
        let axes = [Sensors::GYRO_X, Sensors::GYRO_Y, Sensors::GYRO_Z, Sensors::ACCEL];
        for combo in 0u8..16 {
            let mut mask = Sensors::empty();
            for (i, axis) in axes.iter().enumerate() {
                if combo & (1 << i) != 0 {
                    mask |= *axis;
                }
            }

            let (mut dev, mock) = new_device();
            dev.set_sensors(mask).unwrap();
            let pwr2 = mock.reg(reg::PWR_MGMT_2);

            let gyro_bits = (mask & Sensors::GYRO).bits() >> 4;
            assert_eq!(pwr2 & bits::PWR_GYRO_STBY, !gyro_bits & 0x07, "mask {:?}", mask);
            let accel_standby = pwr2 & bits::PWR_ACCEL_STBY == bits::PWR_ACCEL_STBY;
            assert_eq!(accel_standby, !mask.contains(Sensors::ACCEL), "mask {:?}", mask);
            assert_eq!(dev.get_sensors(), Some(mask));
        }
    }

    #[test]
    fn test_set_sensors_clock_selection() {
        let (mut dev, mock) = new_device();
        dev.set_sensors(Sensors::GYRO_Z).unwrap();
        assert_eq!(mock.reg(reg::PWR_MGMT_1), ClockSource::PllGyroX as u8);

        dev.set_sensors(Sensors::ACCEL).unwrap();
        assert_eq!(mock.reg(reg::PWR_MGMT_1), 0x00);

        dev.set_sensors(Sensors::empty()).unwrap();
        assert_eq!(mock.reg(reg::PWR_MGMT_1), bits::SLEEP);
        assert!(!dev.sensors_powered());
    }

    fn fifo_within_powered(dev: &Mpu6050<MockInterface, MockNoop>) -> bool {
        match (dev.get_fifo_config(), dev.get_sensors()) {
            (Some(fifo), Some(powered)) => powered.contains(fifo),
            (None, _) => true,
            (Some(fifo), None) => fifo.is_empty(),
        }
    }

    #[test]
    fn test_set_sensors_fails_closed() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.configure_fifo(Sensors::GYRO).unwrap();
        mock.state().fail_write_reg = Some(reg::PWR_MGMT_2);

        assert_eq!(
            dev.set_sensors(Sensors::GYRO | Sensors::ACCEL),
            Err(Mpu6050Error::InterfaceError)
        );
        assert_eq!(dev.get_sensors(), Some(Sensors::empty()));
        assert_eq!(dev.get_fifo_config(), Some(Sensors::empty()));
        assert!(!dev.sensors_powered());
        assert!(fifo_within_powered(&dev));
    }

    #[test]
    fn test_set_sensors_fails_closed_on_pwr_mgmt_1() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.configure_fifo(Sensors::GYRO | Sensors::ACCEL).unwrap();
        mock.clear_log();
        mock.state().fail_write_reg = Some(reg::PWR_MGMT_1);

        assert_eq!(
            dev.set_sensors(Sensors::ACCEL),
            Err(Mpu6050Error::InterfaceError)
        );
        assert_eq!(dev.get_sensors(), Some(Sensors::empty()));
        assert!(mock.writes_to(reg::PWR_MGMT_2).is_empty());
        assert_eq!(dev.get_fifo_config(), Some(Sensors::empty()));
        assert!(fifo_within_powered(&dev));
    }

    #[test]
    fn test_set_sensors_trims_fifo_mask() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.configure_fifo(Sensors::GYRO | Sensors::ACCEL).unwrap();
        assert_eq!(mock.reg(reg::FIFO_EN), 0x78);

        dev.set_sensors(Sensors::ACCEL).unwrap();
        assert_eq!(dev.get_fifo_config(), Some(Sensors::ACCEL));
        assert!(fifo_within_powered(&dev));

        // El siguiente reinicio solo pide datos del acelerómetro
        mock.clear_log();
        dev.reset_fifo().unwrap();
        assert_eq!(mock.byte_writes_to(reg::FIFO_EN), vec![0, Sensors::ACCEL.bits()]);
        assert_eq!(mock.reg(reg::FIFO_EN), 0x08);

        // Apagarlo todo vacía la máscara del FIFO
        dev.set_sensors(Sensors::empty()).unwrap();
        assert_eq!(dev.get_fifo_config(), Some(Sensors::empty()));
    }

    #[test]
    fn test_set_sensors_tracks_mask_when_latch_write_fails() {
        let (mut dev, mock) = powered_device(Sensors::ACCEL);
        dev.set_latched_interrupts(true).unwrap();
        dev.configure_fifo(Sensors::ACCEL).unwrap();
        mock.state().fail_write_reg = Some(reg::INT_PIN_CFG);

        assert_eq!(
            dev.set_sensors(Sensors::GYRO_Z),
            Err(Mpu6050Error::InterfaceError)
        );
        // Las dos escrituras de energía llegaron al hardware
        assert_eq!(dev.get_sensors(), Some(Sensors::GYRO_Z));
        assert_eq!(dev.get_fifo_config(), Some(Sensors::empty()));
        assert_eq!(dev.state().latched_interrupts, Some(true));
    }

    #[test]
    fn test_low_power_accel_mode_trims_fifo_mask() {
        let (mut dev, _mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        dev.configure_fifo(Sensors::GYRO_X | Sensors::ACCEL).unwrap();

        dev.set_low_power_accel_mode(5).unwrap();
        assert_eq!(dev.get_sensors(), Some(Sensors::ACCEL));
        assert!(fifo_within_powered(&dev));
    }

    #[test]
    fn test_set_sensors_clears_latched_interrupts() {
        let (mut dev, mock) = powered_device(Sensors::ACCEL);
        dev.set_latched_interrupts(true).unwrap();
        assert_eq!(
            mock.reg(reg::INT_PIN_CFG),
            bits::LATCH_INT_EN | bits::INT_ANYRD_2CLEAR | bits::INT_LEVEL
        );

        // Solo acelerómetro: el latch se conserva
        dev.set_sensors(Sensors::ACCEL).unwrap();
        assert_eq!(dev.state().latched_interrupts, Some(true));

        dev.set_sensors(Sensors::GYRO | Sensors::ACCEL).unwrap();
        assert_eq!(dev.state().latched_interrupts, Some(false));
        assert_eq!(mock.reg(reg::INT_PIN_CFG), bits::INT_LEVEL);
    }

    #[test]
    fn test_sample_rate_divider_and_filter() {
        let cases: [(u16, u8, u16); 6] = [
            (4, 249, 4),
            (1000, 0, 1000),
            (300, 2, 333),
            (200, 4, 200),
            (1, 249, 4),
            (5000, 0, 1000),
        ];
        for (requested, divider, achieved) in cases {
            let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
            dev.set_sample_rate(requested).unwrap();
            assert_eq!(mock.reg(reg::SMPLRT_DIV), divider, "{} Hz", requested);
            assert_eq!(dev.get_sample_rate(), Some(achieved));
            assert_eq!(dev.state().lpf, Some(DlpfBandwidth::for_rate(achieved >> 1)));
        }
    }

    #[test]
    fn test_achieved_rate_matches_divider_formula() {
        let (mut dev, _mock) = powered_device(Sensors::GYRO);
        for hz in 4..=1000u16 {
            dev.set_sample_rate(hz).unwrap();
            let expected = 1000 / (1 + (1000 / hz - 1));
            assert_eq!(dev.get_sample_rate(), Some(expected));
        }
    }

    #[test]
    fn test_setters_ignored_while_asleep() {
        let (mut dev, mock) = powered_device(Sensors::empty());

        dev.set_sample_rate(100).unwrap();
        dev.set_gyro_fullscale(GyroFullScale::Fs500Dps).unwrap();
        dev.set_accel_fullscale(AccelFullScale::Fs8G).unwrap();
        dev.set_lpf(DlpfBandwidth::Hz98).unwrap();
        dev.set_interrupt_enabled(true).unwrap();

        assert!(mock.log().is_empty());
        assert_eq!(dev.state().gyro_fullscale, None);
    }

    #[test]
    fn test_sample_rate_ignored_with_dmp() {
        let (mut dev, mock) = powered_device(Sensors::GYRO);
        dev.base_state.dmp_enabled = true;
        dev.set_sample_rate(100).unwrap();
        assert!(mock.log().is_empty());
    }

    #[test]
    fn test_range_round_trip() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);
        for fsr in [
            GyroFullScale::Fs250Dps,
            GyroFullScale::Fs500Dps,
            GyroFullScale::Fs1000Dps,
            GyroFullScale::Fs2000Dps,
        ] {
            dev.set_gyro_fullscale(fsr).unwrap();
            assert_eq!(dev.get_gyro_fullscale().unwrap(), fsr);
        }
        for fsr in [AccelFullScale::Fs16G, AccelFullScale::Fs4G] {
            dev.set_accel_fullscale(fsr).unwrap();
            assert_eq!(dev.get_accel_fullscale().unwrap(), fsr);
        }
        for lpf in [DlpfBandwidth::Hz256, DlpfBandwidth::Hz5, DlpfBandwidth::Hz42] {
            dev.set_lpf(lpf).unwrap();
            assert_eq!(dev.get_lpf().unwrap(), lpf);
        }
        for source in [ClockSource::PllGyroZ, ClockSource::Internal, ClockSource::PllGyroY] {
            dev.set_clock_source(source).unwrap();
            assert_eq!(dev.get_clock_source().unwrap(), source);
        }

        // Valor repetido: sin escritura
        mock.clear_log();
        dev.set_lpf(DlpfBandwidth::Hz42).unwrap();
        dev.set_accel_fullscale(AccelFullScale::Fs4G).unwrap();
        assert!(mock.log().is_empty());
    }

    #[test]
    fn test_interrupt_enable_modes() {
        let (mut dev, mock) = powered_device(Sensors::GYRO);
        dev.set_interrupt_enabled(true).unwrap();
        assert_eq!(mock.byte_writes_to(reg::INT_ENABLE), vec![bits::DATA_RDY_EN]);

        // Petición redundante
        dev.set_interrupt_enabled(true).unwrap();
        assert_eq!(mock.byte_writes_to(reg::INT_ENABLE).len(), 1);

        dev.base_state.dmp_enabled = true;
        dev.set_interrupt_enabled(true).unwrap();
        assert_eq!(mock.reg(reg::INT_ENABLE), bits::DMP_INT_EN);
        dev.set_interrupt_enabled(false).unwrap();
        assert_eq!(mock.reg(reg::INT_ENABLE), 0);
        assert!(!dev.is_interrupt_enabled());
    }

    #[test]
    fn test_bypass_toggle() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::COMPASS);
        mock.set_reg(reg::USER_CTRL, bits::FIFO_EN | bits::I2C_MST_EN);

        dev.set_bypass(true).unwrap();
        assert_eq!(mock.reg(reg::USER_CTRL), bits::FIFO_EN);
        assert_eq!(mock.reg(reg::INT_PIN_CFG), bits::I2C_BYPASS_EN | bits::INT_LEVEL);

        // Idempotente
        mock.clear_log();
        dev.set_bypass(true).unwrap();
        assert!(mock.log().is_empty());

        // Al desactivar, la brújula necesita el maestro I2C
        dev.set_bypass(false).unwrap();
        assert_eq!(mock.reg(reg::USER_CTRL), bits::FIFO_EN | bits::I2C_MST_EN);
        assert_eq!(mock.reg(reg::INT_PIN_CFG), bits::INT_LEVEL);
        assert!(!dev.is_bypass_enabled());
    }

    #[test]
    fn test_latched_interrupts_keep_bypass() {
        let (mut dev, mock) = powered_device(Sensors::ACCEL);
        dev.set_bypass(true).unwrap();
        dev.set_latched_interrupts(true).unwrap();
        assert_eq!(
            mock.reg(reg::INT_PIN_CFG),
            bits::LATCH_INT_EN | bits::INT_ANYRD_2CLEAR | bits::I2C_BYPASS_EN | bits::INT_LEVEL
        );

        dev.set_interrupt_active_low(false).unwrap();
        assert_eq!(
            mock.reg(reg::INT_PIN_CFG),
            bits::LATCH_INT_EN | bits::INT_ANYRD_2CLEAR | bits::I2C_BYPASS_EN
        );
    }

    #[test]
    fn test_low_power_accel_mode() {
        let (mut dev, mock) = powered_device(Sensors::GYRO | Sensors::ACCEL);

        dev.set_low_power_accel_mode(10).unwrap();
        assert_eq!(mock.reg(reg::PWR_MGMT_1), bits::CYCLE);
        assert_eq!(mock.reg(reg::PWR_MGMT_2), (2 << 6) | bits::PWR_GYRO_STBY);
        assert_eq!(dev.state().lpf, Some(DlpfBandwidth::Hz10));
        assert_eq!(dev.get_sensors(), Some(Sensors::ACCEL));
        assert_eq!(dev.state().latched_interrupts, Some(true));
        assert!(dev.is_low_power_accel_mode());
        // Con el modo de bajo consumo la interrupción queda activa
        assert!(dev.is_interrupt_enabled());

        // Frecuencias bajas se quedan en el modo de bajo consumo
        dev.set_sample_rate(40).unwrap();
        assert_eq!(mock.reg(reg::PWR_MGMT_2), (3 << 6) | bits::PWR_GYRO_STBY);
        assert!(dev.is_low_power_accel_mode());

        // Frecuencias altas salen del modo
        dev.set_sample_rate(100).unwrap();
        assert!(!dev.is_low_power_accel_mode());
        assert_eq!(mock.reg(reg::PWR_MGMT_2), bits::PWR_GYRO_STBY);
        assert_eq!(mock.reg(reg::SMPLRT_DIV), 9);

        assert_eq!(
            dev.set_low_power_accel_mode(41),
            Err(Mpu6050Error::InvalidParameter)
        );
    }

    #[test]
    fn test_read_motion6() {
        let (mut dev, mock) = new_device();
        let raw: [u8; 14] = [
            0x40, 0x00, 0xC0, 0x00, 0x00, 0x01, // accel
            0x00, 0x00, // temp
            0x00, 0x10, 0xFF, 0xFF, 0x7F, 0xFF, // gyro
        ];
        for (i, b) in raw.iter().enumerate() {
            mock.set_reg(reg::ACCEL_XOUT_H + i as u8, *b);
        }

        let m = dev.read_motion6().unwrap();
        assert_eq!(m.accel, [16384, -16384, 1]);
        assert_eq!(m.gyro, [16, -1, 32767]);

        mock.set_reg(reg::TEMP_OUT_H, 0xF2);
        mock.set_reg(reg::TEMP_OUT_H + 1, 0x00);
        assert_eq!(dev.read_temperature_raw().unwrap(), -3584);
    }

    #[test]
    fn test_offsets_and_slave_address() {
        let (mut dev, mock) = new_device();
        mock.set_reg(reg::XG_OFFS_TC, 0x80 | (0x15 << 1) | 0x01);
        mock.set_reg(reg::YG_OFFS_TC, 0x3F << 1);
        assert_eq!(dev.get_gyro_tc_offsets().unwrap(), [0x15, 0x3F, 0x00]);
        assert!(dev.get_otp_bank_valid().unwrap());

        dev.set_otp_bank_valid(false).unwrap();
        dev.set_gyro_tc_offsets([0x01, 0x02, 0x03]).unwrap();
        // PWR_MODE (bit 7) se conserva
        assert_eq!(mock.reg(reg::XG_OFFS_TC), 0x80 | (0x01 << 1));
        assert_eq!(mock.reg(reg::ZG_OFFS_TC), 0x03 << 1);

        dev.set_gyro_user_offsets([-2, 0, 300]).unwrap();
        assert_eq!(dev.get_gyro_user_offsets().unwrap(), [-2, 0, 300]);

        dev.set_slave_address(0, 0x7F).unwrap();
        assert_eq!(dev.get_slave_address(0).unwrap(), 0x7F);
        assert_eq!(dev.set_slave_address(4, 0x10), Err(Mpu6050Error::InvalidParameter));
    }
}
