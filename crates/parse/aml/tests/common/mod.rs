//! Shared fixtures: a fake kernel handler and AML byte builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hadron_aml::pkg_length;
use hadron_aml::{
    AmlError, AmlPath, Blocker, Handler, Interpreter, InterpreterConfig, PciAddress, ThreadId,
};

// ─── Fake handler ──────────────────────────────────────────────────────────

/// Size of the fake physical memory, starting at address 0.
pub const MEMORY_SIZE: usize = 0x1000;

static NEXT_THREAD: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD: u64 = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
}

/// One port or config space access seen by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    IoRead { port: u16, width: u8 },
    IoWrite { port: u16, width: u8, value: u64 },
    PciRead { address: PciAddress, offset: u16, width: u8 },
}

/// Memory array, I/O port map and `std::thread::park` blocking.
pub struct FakeHandler {
    start: Instant,
    threads: Mutex<HashMap<u64, std::thread::Thread>>,
    pub memory: Mutex<Vec<u8>>,
    pub ports: Mutex<HashMap<u16, u64>>,
    pub pci_config: Mutex<HashMap<u16, u64>>,
    pub accesses: Mutex<Vec<Access>>,
}

impl FakeHandler {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            threads: Mutex::new(HashMap::new()),
            memory: Mutex::new(vec![0; MEMORY_SIZE]),
            ports: Mutex::new(HashMap::new()),
            pci_config: Mutex::new(HashMap::new()),
            accesses: Mutex::new(Vec::new()),
        }
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.accesses.lock().unwrap().clone()
    }
}

impl Blocker for FakeHandler {
    fn current_thread(&self) -> ThreadId {
        let id = THREAD.with(|id| *id);
        self.threads
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(std::thread::current);
        ThreadId(id)
    }

    fn block_indefinite(&self) {
        std::thread::park();
    }

    fn block_with_timeout_ms(&self, ms: u64) {
        std::thread::park_timeout(Duration::from_millis(ms));
    }

    fn unblock(&self, thread: ThreadId) {
        if let Some(t) = self.threads.lock().unwrap().get(&thread.0) {
            t.unpark();
        }
    }

    fn ms_since_boot(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Handler for FakeHandler {
    fn read_memory(&self, address: u64, width: u8) -> Result<u64, AmlError> {
        let memory = self.memory.lock().unwrap();
        let start = address as usize;
        let bytes = memory
            .get(start..start + usize::from(width))
            .ok_or(AmlError::Handler("address outside fake memory"))?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn write_memory(&self, address: u64, width: u8, value: u64) -> Result<(), AmlError> {
        let mut memory = self.memory.lock().unwrap();
        let start = address as usize;
        let bytes = memory
            .get_mut(start..start + usize::from(width))
            .ok_or(AmlError::Handler("address outside fake memory"))?;
        bytes.copy_from_slice(&value.to_le_bytes()[..usize::from(width)]);
        Ok(())
    }

    fn read_io(&self, port: u16, width: u8) -> Result<u64, AmlError> {
        self.accesses
            .lock()
            .unwrap()
            .push(Access::IoRead { port, width });
        Ok(self.ports.lock().unwrap().get(&port).copied().unwrap_or(0))
    }

    fn write_io(&self, port: u16, width: u8, value: u64) -> Result<(), AmlError> {
        self.accesses
            .lock()
            .unwrap()
            .push(Access::IoWrite { port, width, value });
        self.ports.lock().unwrap().insert(port, value);
        Ok(())
    }

    fn read_pci(&self, address: PciAddress, offset: u16, width: u8) -> Result<u64, AmlError> {
        self.accesses.lock().unwrap().push(Access::PciRead {
            address,
            offset,
            width,
        });
        Ok(self
            .pci_config
            .lock()
            .unwrap()
            .get(&offset)
            .copied()
            .unwrap_or(u64::MAX))
    }
}

/// An interpreter with default configuration and `aml` loaded.
pub fn load(aml: &[u8]) -> Interpreter<FakeHandler> {
    load_with(InterpreterConfig::default(), aml)
}

/// An interpreter with `config` and `aml` loaded.
pub fn load_with(config: InterpreterConfig, aml: &[u8]) -> Interpreter<FakeHandler> {
    let interp = Interpreter::new(FakeHandler::new(), config);
    interp.load_table(aml).expect("table loads");
    interp
}

pub fn path(text: &str) -> AmlPath {
    AmlPath::parse_str(text).expect("valid path")
}

// ─── AML builders ──────────────────────────────────────────────────────────

/// `prefix PkgLength body`.
pub fn pkg(prefix: &[u8], body: &[u8]) -> Vec<u8> {
    let (len, n) = pkg_length::encode(body.len()).expect("body fits a PkgLength");
    let mut out = prefix.to_vec();
    out.extend_from_slice(&len[..n]);
    out.extend_from_slice(body);
    out
}

pub fn cat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

pub fn byte(v: u8) -> Vec<u8> {
    vec![0x0A, v]
}

pub fn word(v: u16) -> Vec<u8> {
    cat(&[&[0x0B], &v.to_le_bytes()])
}

pub fn dword(v: u32) -> Vec<u8> {
    cat(&[&[0x0C], &v.to_le_bytes()])
}

pub fn string(s: &str) -> Vec<u8> {
    cat(&[&[0x0D], s.as_bytes(), &[0x00]])
}

pub fn buffer(bytes: &[u8]) -> Vec<u8> {
    pkg(&[0x11], &cat(&[&byte(bytes.len() as u8), bytes]))
}

pub fn package(elements: &[&[u8]]) -> Vec<u8> {
    let count = [elements.len() as u8];
    let mut body = count.to_vec();
    for element in elements {
        body.extend_from_slice(element);
    }
    pkg(&[0x12], &body)
}

pub fn name(seg: &[u8], value: &[u8]) -> Vec<u8> {
    cat(&[&[0x08], seg, value])
}

pub fn scope(seg: &[u8], body: &[u8]) -> Vec<u8> {
    pkg(&[0x10], &cat(&[seg, body]))
}

pub fn device(seg: &[u8], body: &[u8]) -> Vec<u8> {
    pkg(&[0x5B, 0x82], &cat(&[seg, body]))
}

pub fn method(seg: &[u8], flags: u8, body: &[u8]) -> Vec<u8> {
    pkg(&[0x14], &cat(&[seg, &[flags], body]))
}

pub fn ret(value: &[u8]) -> Vec<u8> {
    cat(&[&[0xA4], value])
}

pub fn store(value: &[u8], target: &[u8]) -> Vec<u8> {
    cat(&[&[0x70], value, target])
}

pub fn if_(predicate: &[u8], body: &[u8]) -> Vec<u8> {
    pkg(&[0xA0], &cat(&[predicate, body]))
}

pub fn else_(body: &[u8]) -> Vec<u8> {
    pkg(&[0xA1], body)
}

pub fn while_(predicate: &[u8], body: &[u8]) -> Vec<u8> {
    pkg(&[0xA2], &cat(&[predicate, body]))
}

/// `OperationRegion(seg, space, offset, length)`.
pub fn op_region(seg: &[u8], space: u8, offset: &[u8], length: &[u8]) -> Vec<u8> {
    cat(&[&[0x5B, 0x80], seg, &[space], offset, length])
}

fn field_list(fields: &[(&[u8], u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (seg, bits) in fields {
        out.extend_from_slice(seg);
        out.push(*bits);
    }
    out
}

/// `Field(region, flags) { fields }` with bit widths below 64.
pub fn field(region: &[u8], flags: u8, fields: &[(&[u8], u8)]) -> Vec<u8> {
    pkg(&[0x5B, 0x81], &cat(&[region, &[flags], &field_list(fields)]))
}

/// `IndexField(index, data, flags) { fields }`.
pub fn index_field(index: &[u8], data: &[u8], flags: u8, fields: &[(&[u8], u8)]) -> Vec<u8> {
    pkg(
        &[0x5B, 0x86],
        &cat(&[index, data, &[flags], &field_list(fields)]),
    )
}

pub const ZERO: &[u8] = &[0x00];
pub const ONE: &[u8] = &[0x01];
pub const ONES: &[u8] = &[0xFF];
pub const LOCAL0: &[u8] = &[0x60];
pub const LOCAL1: &[u8] = &[0x61];
pub const ARG0: &[u8] = &[0x68];
pub const ARG1: &[u8] = &[0x69];
pub const NULL_TARGET: &[u8] = &[0x00];
