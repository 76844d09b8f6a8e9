//! Acceso a la memoria paginada del DMP y aplicación de parches
//!
//! La memoria interna del DMP son 32 bancos de 256 bytes. Se selecciona el
//! banco en MEM_BANK_SEL, la dirección inicial en MEM_START_ADDR y después
//! los datos pasan por MEM_R_W con autoincremento. Ninguna transferencia
//! puede cruzar el final de un banco.

use embedded_hal::blocking::delay::DelayMs;

use crate::device::{Mpu6050, Mpu6050Error};
use crate::interface::Interface;
use crate::register::{dmp, registers as reg};
use crate::types::bits;

/// Posición en la memoria del DMP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAddress {
    pub bank: u8,
    pub offset: u8,
}

impl MemoryAddress {
    pub fn new(bank: u8, offset: u8) -> Self {
        Self { bank, offset }
    }

    /// Dirección lineal (banco * 256 + offset)
    pub fn linear(&self) -> usize {
        self.bank as usize * dmp::BANK_SIZE + self.offset as usize
    }

    /// Bytes hasta el final del banco actual
    pub fn remaining_in_bank(&self) -> usize {
        dmp::BANK_SIZE - self.offset as usize
    }

    /// Avanza `count` bytes, pasando al banco siguiente si hace falta
    pub fn advance(&self, count: usize) -> Result<Self, Mpu6050Error> {
        let linear = self.linear() + count;
        if linear >= dmp::BANK_COUNT * dmp::BANK_SIZE {
            return Err(Mpu6050Error::InvalidParameter);
        }
        Ok(Self {
            bank: (linear / dmp::BANK_SIZE) as u8,
            offset: (linear % dmp::BANK_SIZE) as u8,
        })
    }

    /// Comprueba que `len` bytes a partir de aquí caben en la memoria
    fn check_span(&self, len: usize) -> Result<(), Mpu6050Error> {
        if self.bank as usize >= dmp::BANK_COUNT
            || self.linear() + len > dmp::BANK_COUNT * dmp::BANK_SIZE
        {
            return Err(Mpu6050Error::InvalidParameter);
        }
        Ok(())
    }
}

/// Registro de un conjunto de parches: `[banco, offset, longitud, datos...]`
///
/// Una longitud 0 indica una instrucción especial de un byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchRecord<'a> {
    Write { address: MemoryAddress, data: &'a [u8] },
    Special { address: MemoryAddress, code: u8 },
}

/// Iterador sobre los registros de una tabla de parches
///
/// Una tabla truncada produce `MalformedPatchSet` y termina la iteración.
pub struct PatchRecords<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

pub fn patch_records(data: &[u8]) -> PatchRecords<'_> {
    PatchRecords {
        data,
        pos: 0,
        done: false,
    }
}

impl<'a> Iterator for PatchRecords<'a> {
    type Item = Result<PatchRecord<'a>, Mpu6050Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }

        let rest = &self.data[self.pos..];
        if rest.len() < 3 {
            self.done = true;
            return Some(Err(Mpu6050Error::MalformedPatchSet));
        }
        let address = MemoryAddress::new(rest[0], rest[1]);
        let length = rest[2] as usize;

        let record = if length == 0 {
            match rest.get(3) {
                Some(&code) => {
                    self.pos += 4;
                    PatchRecord::Special { address, code }
                }
                None => {
                    self.done = true;
                    return Some(Err(Mpu6050Error::MalformedPatchSet));
                }
            }
        } else {
            match rest.get(3..3 + length) {
                Some(data) => {
                    self.pos += 3 + length;
                    PatchRecord::Write { address, data }
                }
                None => {
                    self.done = true;
                    return Some(Err(Mpu6050Error::MalformedPatchSet));
                }
            }
        };
        Some(Ok(record))
    }
}

/// Instrucción especial: activar las interrupciones del DMP
const SPECIAL_ENABLE_DMP_INTERRUPTS: u8 = 0x01;

impl<I, D> Mpu6050<I, D>
where
    I: Interface,
    D: DelayMs<u32>,
{
    /// Selecciona el banco de memoria del DMP
    pub fn set_memory_bank(&mut self, bank: u8, prefetch: bool, user_bank: bool) -> Result<(), Mpu6050Error> {
        let mut value = bank & bits::MEM_BANK_MASK;
        if user_bank {
            value |= bits::MEM_USER_BANK;
        }
        if prefetch {
            value |= bits::MEM_PREFETCH;
        }
        self.write_byte(reg::MEM_BANK_SEL, value)
    }

    pub fn set_memory_start_address(&mut self, offset: u8) -> Result<(), Mpu6050Error> {
        self.write_byte(reg::MEM_START_ADDR, offset)
    }

    /// Lee un byte en la posición seleccionada
    pub fn read_memory_byte(&mut self) -> Result<u8, Mpu6050Error> {
        self.read_byte(reg::MEM_R_W)
    }

    fn select_memory(&mut self, address: MemoryAddress) -> Result<(), Mpu6050Error> {
        self.set_memory_bank(address.bank, false, false)?;
        self.set_memory_start_address(address.offset)
    }

    /// Revisión del hardware (banco de usuario 16, byte 6)
    pub fn hardware_revision(&mut self) -> Result<u8, Mpu6050Error> {
        self.set_memory_bank(dmp::HW_REVISION_BANK, true, true)?;
        self.set_memory_start_address(dmp::HW_REVISION_OFFSET)?;
        let revision = self.read_memory_byte()?;
        self.set_memory_bank(0, false, false)?;
        Ok(revision)
    }

    /// Escribe un bloque en la memoria del DMP a partir de `address`
    ///
    /// Los datos se parten en trozos que no cruzan el final de un banco. Con
    /// `verify` cada trozo se vuelve a leer y una diferencia aborta la
    /// escritura con `MemoryVerificationFailed`.
    pub fn write_memory_block(
        &mut self,
        data: &[u8],
        address: MemoryAddress,
        verify: bool,
    ) -> Result<(), Mpu6050Error> {
        address.check_span(data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let mut readback = [0u8; dmp::BANK_SIZE];
        let mut current = address;
        let mut written = 0;

        self.select_memory(current)?;

        while written < data.len() {
            let chunk_len = (data.len() - written).min(current.remaining_in_bank());
            let chunk = &data[written..written + chunk_len];

            self.write_bytes(reg::MEM_R_W, chunk)?;

            if verify {
                self.select_memory(current)?;
                self.read_bytes(reg::MEM_R_W, &mut readback[..chunk_len])?;
                if let Some(pos) = chunk
                    .iter()
                    .zip(readback.iter())
                    .position(|(expected, read)| expected != read)
                {
                    let bad = current.advance(pos)?;
                    log::error!(
                        "Verificación fallida en banco {} offset 0x{:02X}",
                        bad.bank,
                        bad.offset
                    );
                    return Err(Mpu6050Error::MemoryVerificationFailed {
                        bank: bad.bank,
                        offset: bad.offset,
                    });
                }
            }

            written += chunk_len;
            if written < data.len() {
                current = current.advance(chunk_len)?;
                self.select_memory(current)?;
            }
        }

        Ok(())
    }

    /// Lee `buf.len()` bytes de la memoria del DMP a partir de `address`
    pub fn read_memory_block(&mut self, buf: &mut [u8], address: MemoryAddress) -> Result<(), Mpu6050Error> {
        address.check_span(buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }

        let mut current = address;
        let mut read = 0;

        self.select_memory(current)?;

        while read < buf.len() {
            let chunk_len = (buf.len() - read).min(current.remaining_in_bank());
            self.read_bytes(reg::MEM_R_W, &mut buf[read..read + chunk_len])?;

            read += chunk_len;
            if read < buf.len() {
                current = current.advance(chunk_len)?;
                self.select_memory(current)?;
            }
        }

        Ok(())
    }

    /// Aplica una tabla de parches de configuración del DMP
    pub fn write_configuration_set(&mut self, patches: &[u8]) -> Result<(), Mpu6050Error> {
        let verify = self.config.verify_firmware;

        for record in patch_records(patches) {
            match record? {
                PatchRecord::Write { address, data } => {
                    self.write_memory_block(data, address, verify)?;
                }
                PatchRecord::Special { code, .. } => match code {
                    SPECIAL_ENABLE_DMP_INTERRUPTS => {
                        self.write_byte(reg::INT_ENABLE, bits::DMP_PATCH_INT)?;
                    }
                    other => {
                        log::error!("Instrucción especial desconocida: 0x{:02X}", other);
                        return Err(Mpu6050Error::UnknownPatchInstruction(other));
                    }
                },
            }
        }
        Ok(())
    }

    /// Escribe un bloque de actualización (un único registro de parche)
    pub fn apply_update_block(&mut self, block: &[u8]) -> Result<(), Mpu6050Error> {
        let mut records = patch_records(block);
        let record = records.next().ok_or(Mpu6050Error::MalformedPatchSet)??;
        if records.next().is_some() {
            return Err(Mpu6050Error::MalformedPatchSet);
        }

        match record {
            PatchRecord::Write { address, data } => {
                let verify = self.config.verify_firmware;
                self.write_memory_block(data, address, verify)
            }
            PatchRecord::Special { code, .. } => Err(Mpu6050Error::UnknownPatchInstruction(code)),
        }
    }
}
