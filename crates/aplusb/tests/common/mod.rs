//! Host-only `Backend` that journals every acquire/release and can be told to
//! fail at any driver call.
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    path::PathBuf,
    rc::Rc,
};

use aplusb::{AccessKind, Backend, BenchConfig, Completion, DeviceDescriptor, DeviceKind, NdRange, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Acquire(&'static str),
    Release(&'static str),
}

pub type Journal = Rc<RefCell<Vec<Entry>>>;

/// Logs its name on creation and on drop.
pub struct Tracked {
    name: &'static str,
    journal: Journal,
}

impl Tracked {
    fn acquire(name: &'static str, journal: &Journal) -> Self {
        journal.borrow_mut().push(Entry::Acquire(name));
        Self { name, journal: Rc::clone(journal) }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.journal.borrow_mut().push(Entry::Release(self.name));
    }
}

/// Driver call to fail. Counters are zero-based per loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Devices,
    Context,
    Queue,
    Buffer(usize),
    Program,
    Build,
    Kernel,
    SetArgs,
    Enqueue(usize),
    Wait(usize),
    Read(usize),
    ReadWait(usize),
}

pub const INJECTED: Status = Status(-5);
const BUFFER_NAMES: [&str; 3] = ["buffer a", "buffer b", "buffer c"];

type Shared = Rc<RefCell<Vec<f32>>>;

pub struct MockBuffer {
    data: Shared,
    _tracked: Tracked,
}

pub struct MockProgram {
    source: String,
    built: bool,
    _tracked: Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Sum,
    CopyA,
    Nothing,
}

pub struct MockKernel {
    op: Op,
    guarded: bool,
    args: Option<(Shared, Shared, Shared, u32)>,
    _tracked: Tracked,
}

pub struct MockPending(Result<(), Status>);

impl Completion for MockPending {
    fn wait(self) -> Result<(), Status> {
        self.0
    }
}

pub struct MockBackend {
    inventory: Vec<(DeviceKind, &'static str)>,
    fail: Option<FailAt>,
    pub journal: Journal,
    buffers: Cell<usize>,
    dispatches: Cell<usize>,
    reads: Cell<usize>,
    pub last_range: Cell<Option<NdRange>>,
    pub readback: RefCell<Vec<f32>>,
    pub build_calls: Cell<usize>,
}

impl MockBackend {
    pub fn with_devices(devices: &[(DeviceKind, &'static str)]) -> Self {
        Self {
            inventory: devices.to_vec(),
            fail: None,
            journal: Journal::default(),
            buffers: Cell::new(0),
            dispatches: Cell::new(0),
            reads: Cell::new(0),
            last_range: Cell::new(None),
            readback: RefCell::new(Vec::new()),
            build_calls: Cell::new(0),
        }
    }

    pub fn gpu() -> Self {
        Self::with_devices(&[(DeviceKind::Gpu, "Mock GPU")])
    }

    pub fn failing(mut self, at: FailAt) -> Self {
        self.fail = Some(at);
        self
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.journal.borrow().clone()
    }

    fn check(&self, at: FailAt) -> Result<(), Status> {
        if self.fail == Some(at) { Err(INJECTED) } else { Ok(()) }
    }

    fn tick(counter: &Cell<usize>) -> usize {
        let i = counter.get();
        counter.set(i + 1);
        i
    }
}

impl Backend for MockBackend {
    type Device = usize;
    type Context = Tracked;
    type Queue = Tracked;
    type Buffer = MockBuffer;
    type Program = MockProgram;
    type Kernel = MockKernel;
    type Pending = MockPending;

    fn devices(&self) -> Result<Vec<DeviceDescriptor<usize>>, Status> {
        self.check(FailAt::Devices)?;
        Ok(self
            .inventory
            .iter()
            .enumerate()
            .map(|(handle, &(kind, name))| DeviceDescriptor {
                handle,
                kind,
                name: name.to_owned(),
                platform: 0,
            })
            .collect())
    }

    fn create_context(&self, _device: &usize) -> Result<Tracked, Status> {
        self.check(FailAt::Context)?;
        Ok(Tracked::acquire("context", &self.journal))
    }

    fn create_queue(&self, _context: &Tracked, _device: &usize) -> Result<Tracked, Status> {
        self.check(FailAt::Queue)?;
        Ok(Tracked::acquire("queue", &self.journal))
    }

    fn create_buffer(
        &self,
        _context: &Tracked,
        access: AccessKind,
        len: usize,
        init: Option<&[f32]>,
    ) -> Result<MockBuffer, Status> {
        let i = Self::tick(&self.buffers);
        self.check(FailAt::Buffer(i))?;
        let data = match (access, init) {
            (AccessKind::ReadOnly, Some(host)) => host.to_vec(),
            // Uninitialized device memory.
            _ => vec![f32::NAN; len],
        };
        Ok(MockBuffer {
            data: Rc::new(RefCell::new(data)),
            _tracked: Tracked::acquire(BUFFER_NAMES[i.min(2)], &self.journal),
        })
    }

    fn create_program(&self, _context: &Tracked, source: &str) -> Result<MockProgram, Status> {
        self.check(FailAt::Program)?;
        Ok(MockProgram {
            source: source.to_owned(),
            built: false,
            _tracked: Tracked::acquire("program", &self.journal),
        })
    }

    fn build_program(&self, program: &mut MockProgram, _device: &usize) -> Result<(), Status> {
        self.build_calls.set(self.build_calls.get() + 1);
        self.check(FailAt::Build)?;
        if program.source.contains("#error") {
            return Err(Status(-11));
        }
        program.built = true;
        Ok(())
    }

    fn build_log(&self, program: &MockProgram, _device: &usize) -> Result<String, Status> {
        if let Some(line) = program.source.lines().find(|l| l.contains("#error")) {
            return Ok(format!("<kernel>:1:2: error: {}\n", line.trim()));
        }
        if program.source.contains("unused") {
            return Ok("<kernel>:1:1: warning: unused variable\n".into());
        }
        Ok("\n".into())
    }

    fn create_kernel(&self, program: &MockProgram, name: &str) -> Result<MockKernel, Status> {
        self.check(FailAt::Kernel)?;
        if !program.built || !program.source.contains(&format!("void {name}")) {
            return Err(Status(-46));
        }
        let src = &program.source;
        let op = if src.contains("a[i] + b[i]") {
            Op::Sum
        } else if src.contains("c[i] = a[i];") {
            Op::CopyA
        } else {
            Op::Nothing
        };
        Ok(MockKernel {
            op,
            guarded: src.contains("i >= n") || src.contains("i < n"),
            args: None,
            _tracked: Tracked::acquire("kernel", &self.journal),
        })
    }

    fn set_args(
        &self,
        kernel: &mut MockKernel,
        a: &MockBuffer,
        b: &MockBuffer,
        c: &MockBuffer,
        n: u32,
    ) -> Result<(), Status> {
        self.check(FailAt::SetArgs)?;
        kernel.args = Some((Rc::clone(&a.data), Rc::clone(&b.data), Rc::clone(&c.data), n));
        Ok(())
    }

    fn enqueue_kernel(&self, _queue: &Tracked, kernel: &MockKernel, range: NdRange)
        -> Result<MockPending, Status> {
        let k = Self::tick(&self.dispatches);
        self.check(FailAt::Enqueue(k))?;
        self.last_range.set(Some(range));
        let Some((a, b, c, n)) = &kernel.args else {
            return Err(Status(-52));
        };
        let (a, b, mut c) = (a.borrow(), b.borrow(), c.borrow_mut());
        for i in 0..range.global {
            if kernel.guarded && i >= *n as usize {
                continue;
            }
            if i >= c.len() {
                // Out-of-bounds store faults the command.
                return Ok(MockPending(Err(Status(-5))));
            }
            match kernel.op {
                Op::Sum => c[i] = a[i] + b[i],
                Op::CopyA => c[i] = a[i],
                Op::Nothing => {}
            }
        }
        Ok(MockPending(self.check(FailAt::Wait(k))))
    }

    fn enqueue_read(&self, _queue: &Tracked, buffer: &MockBuffer, host: &mut [f32])
        -> Result<MockPending, Status> {
        let k = Self::tick(&self.reads);
        self.check(FailAt::Read(k))?;
        host.copy_from_slice(&buffer.data.borrow());
        *self.readback.borrow_mut() = host.to_vec();
        Ok(MockPending(self.check(FailAt::ReadWait(k))))
    }
}

// ─── Fixtures ────────────────────────────────────────────────────────

pub fn bundled_kernel() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/cl/aplusb.cl")
}

/// Small, fast configuration on the bundled kernel.
pub fn small_config(n: usize) -> BenchConfig {
    BenchConfig::default().with_n(n).with_iterations(5).with_kernel_path(bundled_kernel())
}

/// Kernel source written to a temporary file; keep the dir alive.
pub fn kernel_file(source: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("aplusb.cl");
    std::fs::write(&path, source).expect("write kernel");
    (dir, path)
}

pub const COPY_A_KERNEL: &str = "
__kernel void aplusb(__global const float* a, __global const float* b,
                     __global float* c, unsigned int n)
{
    const unsigned int i = get_global_id(0);
    if (i >= n) return;
    c[i] = a[i];
}
";

pub const UNGUARDED_KERNEL: &str = "
__kernel void aplusb(__global const float* a, __global const float* b,
                     __global float* c, unsigned int n)
{
    const unsigned int i = get_global_id(0);
    c[i] = a[i] + b[i];
}
";

pub const BROKEN_SYNTAX_KERNEL: &str = "
#error missing semicolon after declaration
__kernel void aplusb(__global const float* a) {}
";

pub const WRONG_NAME_KERNEL: &str = "
__kernel void vec_add(__global const float* a, __global const float* b,
                      __global float* c, unsigned int n)
{
    const unsigned int i = get_global_id(0);
    if (i >= n) return;
    c[i] = a[i] + b[i];
}
";

/// Every release matches the latest unreleased acquire, and nothing leaks.
pub fn assert_released_in_reverse(entries: &[Entry]) {
    let mut live: Vec<&'static str> = Vec::new();
    for entry in entries {
        match *entry {
            Entry::Acquire(name) => live.push(name),
            Entry::Release(name) => {
                assert_eq!(live.pop(), Some(name), "out-of-order release in {entries:?}");
            }
        }
    }
    assert!(live.is_empty(), "leaked {live:?} in {entries:?}");
}
