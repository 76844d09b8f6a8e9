//! Interfaz simulada a nivel de registros para las pruebas
//!
//! Modela el mapa de registros, la memoria paginada del DMP, el FIFO y los
//! bits de reset autolimpiables. Registra cada operación para poder comprobar
//! secuencias exactas de escritura.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal_mock::delay::MockNoop;

use super::Interface;
use crate::device::Mpu6050;
use crate::register::registers as reg;
use crate::types::{bits, Sensors};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Write(u8, Vec<u8>),
    Read(u8, usize),
}

pub(crate) struct MockState {
    pub regs: [u8; 128],
    pub memory: Vec<[u8; 256]>,
    pub fifo: VecDeque<u8>,
    /// Bytes que aparecen en el FIFO en cada lectura de FIFO_COUNT
    pub fifo_fill_on_count: usize,
    pub log: Vec<Op>,
    /// Falla toda escritura a este registro
    pub fail_write_reg: Option<u8>,
    /// Falla toda lectura de este registro
    pub fail_read_reg: Option<u8>,
    /// Invierte los bytes leídos de la memoria DMP
    pub corrupt_memory_reads: bool,
    mem_bank: usize,
    mem_addr: u8,
}

impl MockState {
    fn power_on_registers() -> [u8; 128] {
        let mut regs = [0u8; 128];
        regs[reg::PWR_MGMT_1 as usize] = bits::SLEEP;
        regs[reg::WHO_AM_I as usize] = 0x68;
        regs
    }

    fn fifo_count(&self) -> [u8; 2] {
        (self.fifo.len() as u16).to_be_bytes()
    }
}

#[derive(Clone)]
pub(crate) struct MockInterface {
    state: Rc<RefCell<MockState>>,
    address: u8,
}

impl MockInterface {
    pub fn new() -> Self {
        let state = MockState {
            regs: MockState::power_on_registers(),
            memory: vec![[0u8; 256]; 32],
            fifo: VecDeque::new(),
            fifo_fill_on_count: 0,
            log: Vec::new(),
            fail_write_reg: None,
            fail_read_reg: None,
            corrupt_memory_reads: false,
            mem_bank: 0,
            mem_addr: 0,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            address: 0x68,
        }
    }

    pub fn state(&self) -> std::cell::RefMut<'_, MockState> {
        self.state.borrow_mut()
    }

    pub fn reg(&self, r: u8) -> u8 {
        self.state.borrow().regs[r as usize]
    }

    pub fn set_reg(&self, r: u8, value: u8) {
        self.state.borrow_mut().regs[r as usize] = value;
    }

    pub fn push_fifo(&self, data: &[u8]) {
        self.state.borrow_mut().fifo.extend(data.iter().copied());
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    pub fn log(&self) -> Vec<Op> {
        self.state.borrow().log.clone()
    }

    /// Valores escritos en un registro, en orden
    pub fn writes_to(&self, r: u8) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|op| match op {
                Op::Write(w, data) if *w == r => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Bytes escritos en un registro de un solo byte, en orden
    pub fn byte_writes_to(&self, r: u8) -> Vec<u8> {
        self.writes_to(r).iter().filter_map(|d| d.first().copied()).collect()
    }

    pub fn was_read(&self, r: u8) -> bool {
        self.state
            .borrow()
            .log
            .iter()
            .any(|op| matches!(op, Op::Read(x, _) if *x == r))
    }

    pub fn memory(&self, bank: usize, offset: usize, len: usize) -> Vec<u8> {
        let state = self.state.borrow();
        let mut out = Vec::with_capacity(len);
        let (mut b, mut o) = (bank, offset);
        for _ in 0..len {
            out.push(state.memory[b][o]);
            o += 1;
            if o == 256 {
                o = 0;
                b += 1;
            }
        }
        out
    }

    pub fn set_memory(&self, bank: usize, offset: usize, value: u8) {
        self.state.borrow_mut().memory[bank][offset] = value;
    }
}

impl Interface for MockInterface {
    type Error = MockError;

    fn write_reg(&mut self, r: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        s.log.push(Op::Write(r, data.to_vec()));
        if s.fail_write_reg == Some(r) {
            return Err(MockError);
        }

        match r {
            reg::MEM_BANK_SEL => {
                s.regs[r as usize] = data[0];
                s.mem_bank = (data[0] & bits::MEM_BANK_MASK) as usize;
            }
            reg::MEM_START_ADDR => {
                s.regs[r as usize] = data[0];
                s.mem_addr = data[0];
            }
            reg::MEM_R_W => {
                for &b in data {
                    let (bank, addr) = (s.mem_bank, s.mem_addr as usize);
                    s.memory[bank][addr] = b;
                    s.mem_addr = s.mem_addr.wrapping_add(1);
                }
            }
            reg::FIFO_R_W => s.fifo.extend(data.iter().copied()),
            reg::USER_CTRL => {
                if data[0] & bits::FIFO_RST != 0 {
                    s.fifo.clear();
                }
                s.regs[r as usize] = data[0] & !(bits::FIFO_RST | bits::DMP_RST | bits::I2C_MST_RST);
            }
            reg::PWR_MGMT_1 if data[0] & bits::H_RESET != 0 => {
                // Los offsets de fábrica (XG/YG/ZG_OFFS_TC) sobreviven al reset
                let mut regs = MockState::power_on_registers();
                regs[..3].copy_from_slice(&s.regs[..3]);
                s.regs = regs;
                s.fifo.clear();
            }
            _ => {
                for (i, &b) in data.iter().enumerate() {
                    s.regs[(r as usize + i) & 0x7F] = b;
                }
            }
        }
        Ok(())
    }

    fn read_reg(&mut self, r: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        s.log.push(Op::Read(r, data.len()));
        if s.fail_read_reg == Some(r) {
            return Err(MockError);
        }

        match r {
            reg::MEM_R_W => {
                let corrupt = s.corrupt_memory_reads;
                for b in data.iter_mut() {
                    let (bank, addr) = (s.mem_bank, s.mem_addr as usize);
                    *b = if corrupt { !s.memory[bank][addr] } else { s.memory[bank][addr] };
                    s.mem_addr = s.mem_addr.wrapping_add(1);
                }
            }
            reg::FIFO_COUNTH => {
                let fill = s.fifo_fill_on_count;
                s.fifo.extend(std::iter::repeat(0u8).take(fill));
                let count = s.fifo_count();
                for (b, c) in data.iter_mut().zip(count.iter()) {
                    *b = *c;
                }
            }
            reg::FIFO_R_W => {
                for b in data.iter_mut() {
                    *b = s.fifo.pop_front().unwrap_or(0);
                }
            }
            _ => {
                for (i, b) in data.iter_mut().enumerate() {
                    *b = s.regs[(r as usize + i) & 0x7F];
                }
            }
        }
        Ok(())
    }

    fn device_address(&self) -> u8 {
        self.address
    }
}

/// Driver sobre la interfaz simulada; devuelve también un manejador de la simulación
pub(crate) fn new_device() -> (Mpu6050<MockInterface, MockNoop>, MockInterface) {
    let mock = MockInterface::new();
    (Mpu6050::new(mock.clone(), MockNoop::new()), mock)
}

/// Como `new_device`, con los sensores indicados ya alimentados y el registro limpio
pub(crate) fn powered_device(sensors: Sensors) -> (Mpu6050<MockInterface, MockNoop>, MockInterface) {
    let (mut dev, mock) = new_device();
    dev.set_sensors(sensors).unwrap();
    mock.clear_log();
    (dev, mock)
}
