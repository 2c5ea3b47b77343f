//! In-process stand-ins for the native compiler, for unit tests

use crate::Backend;
use crate::macros::ledger;
use fxc_sys::{
    D3D_SHADER_MACRO, E_FAIL, HRESULT, ID3DBlob, ID3DBlobVtbl, ID3DInclude, LPCSTR, LPVOID,
    SIZE_T, UINT,
};
use std::ffi::{CStr, c_void};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A Rust-side `ID3DBlob` that counts its final releases.
#[repr(C)]
pub(crate) struct FakeBlob {
    vtable: *const ID3DBlobVtbl,
    data: Vec<u8>,
    reported_size: usize,
    has_buffer: bool,
    refs: AtomicU32,
    releases: Arc<AtomicUsize>,
}

unsafe extern "system" fn fake_query_interface(
    _this: *mut ID3DBlob,
    _riid: *const c_void,
    ppv: *mut *mut c_void,
) -> HRESULT {
    if !ppv.is_null() {
        unsafe { *ppv = std::ptr::null_mut() };
    }
    E_FAIL
}

unsafe extern "system" fn fake_add_ref(this: *mut ID3DBlob) -> u32 {
    let blob = unsafe { &*(this as *mut FakeBlob) };
    blob.refs.fetch_add(1, Ordering::SeqCst) + 1
}

unsafe extern "system" fn fake_release(this: *mut ID3DBlob) -> u32 {
    let blob = this as *mut FakeBlob;
    let count = unsafe { (*blob).refs.fetch_sub(1, Ordering::SeqCst) } - 1;
    if count == 0 {
        let blob = unsafe { Box::from_raw(blob) };
        blob.releases.fetch_add(1, Ordering::SeqCst);
    }
    count
}

unsafe extern "system" fn fake_get_buffer_pointer(this: *mut ID3DBlob) -> LPVOID {
    let blob = unsafe { &*(this as *mut FakeBlob) };
    if blob.has_buffer {
        blob.data.as_ptr() as LPVOID
    } else {
        std::ptr::null_mut()
    }
}

unsafe extern "system" fn fake_get_buffer_size(this: *mut ID3DBlob) -> SIZE_T {
    unsafe { (*(this as *mut FakeBlob)).reported_size }
}

static FAKE_BLOB_VTABLE: ID3DBlobVtbl = ID3DBlobVtbl {
    QueryInterface: fake_query_interface,
    AddRef: fake_add_ref,
    Release: fake_release,
    GetBufferPointer: fake_get_buffer_pointer,
    GetBufferSize: fake_get_buffer_size,
};

impl FakeBlob {
    fn boxed(
        data: Vec<u8>,
        reported_size: usize,
        has_buffer: bool,
        releases: &Arc<AtomicUsize>,
    ) -> *mut ID3DBlob {
        Box::into_raw(Box::new(FakeBlob {
            vtable: &FAKE_BLOB_VTABLE,
            data,
            reported_size,
            has_buffer,
            refs: AtomicU32::new(1),
            releases: Arc::clone(releases),
        })) as *mut ID3DBlob
    }

    /// A blob holding `data`, with one reference owned by the caller.
    pub(crate) fn create(data: Vec<u8>, releases: &Arc<AtomicUsize>) -> *mut ID3DBlob {
        let size = data.len();
        Self::boxed(data, size, true, releases)
    }

    /// A blob that claims `size` bytes but returns a null buffer.
    pub(crate) fn without_buffer(size: usize, releases: &Arc<AtomicUsize>) -> *mut ID3DBlob {
        Self::boxed(Vec::new(), size, false, releases)
    }
}

/// What the backend saw during its last call.
#[derive(Debug, Default, Clone)]
pub(crate) struct SeenCall {
    pub source: Vec<u8>,
    pub source_name: Option<String>,
    /// Every slot of the macro table, sentinel pair included
    pub macro_slots: Option<Vec<Option<String>>>,
    pub include: usize,
    pub entry_point: Option<String>,
    pub target: Option<String>,
    pub flags1: u32,
    pub flags2: u32,
    pub comment: Option<String>,
    /// Native macro allocations alive while the call ran
    pub live_allocations: usize,
}

/// How a fake blob output should look.
#[derive(Debug, Clone)]
pub(crate) enum FakeOutput {
    Absent,
    Bytes(Vec<u8>),
    WithoutBuffer(usize),
}

/// A backend that records its inputs and returns canned outputs.
pub(crate) struct RecordingBackend {
    pub status: HRESULT,
    pub code: FakeOutput,
    pub errors: FakeOutput,
    pub calls: AtomicUsize,
    pub blobs_created: AtomicUsize,
    pub releases: Arc<AtomicUsize>,
    pub seen: Mutex<SeenCall>,
}

impl RecordingBackend {
    pub(crate) fn new(status: HRESULT, code: FakeOutput, errors: FakeOutput) -> Self {
        RecordingBackend {
            status,
            code,
            errors,
            calls: AtomicUsize::new(0),
            blobs_created: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            seen: Mutex::new(SeenCall::default()),
        }
    }

    pub(crate) fn succeeding(bytecode: &[u8]) -> Self {
        Self::new(0, FakeOutput::Bytes(bytecode.to_vec()), FakeOutput::Absent)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> SeenCall {
        self.seen.lock().unwrap().clone()
    }

    /// True when every blob handed out has been released.
    pub(crate) fn all_released(&self) -> bool {
        self.blobs_created.load(Ordering::SeqCst) == self.releases.load(Ordering::SeqCst)
    }

    fn produce(&self, output: &FakeOutput, out: *mut *mut ID3DBlob) {
        if out.is_null() {
            return;
        }
        let blob = match output {
            FakeOutput::Absent => std::ptr::null_mut(),
            FakeOutput::Bytes(bytes) => FakeBlob::create(bytes.clone(), &self.releases),
            FakeOutput::WithoutBuffer(size) => FakeBlob::without_buffer(*size, &self.releases),
        };
        if !blob.is_null() {
            self.blobs_created.fetch_add(1, Ordering::SeqCst);
        }
        unsafe { *out = blob };
    }

    fn record(&self, f: impl FnOnce(&mut SeenCall)) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut seen = self.seen.lock().unwrap();
        *seen = SeenCall {
            live_allocations: ledger::live(),
            ..SeenCall::default()
        };
        f(&mut seen);
    }
}

unsafe fn text(ptr: LPCSTR) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

unsafe fn read_macro_slots(defines: *const D3D_SHADER_MACRO) -> Option<Vec<Option<String>>> {
    if defines.is_null() {
        return None;
    }
    let mut slots = Vec::new();
    let mut entry = defines;
    loop {
        let m = unsafe { *entry };
        unsafe {
            slots.push(text(m.Name));
            slots.push(text(m.Definition));
        }
        if m.Name.is_null() {
            return Some(slots);
        }
        entry = unsafe { entry.add(1) };
    }
}

unsafe impl Backend for RecordingBackend {
    unsafe fn d3d_compile(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        source_name: LPCSTR,
        defines: *const D3D_SHADER_MACRO,
        include: *mut ID3DInclude,
        entry_point: LPCSTR,
        target: LPCSTR,
        flags1: UINT,
        flags2: UINT,
        code: *mut *mut ID3DBlob,
        error_msgs: *mut *mut ID3DBlob,
    ) -> HRESULT {
        self.record(|seen| unsafe {
            seen.source = std::slice::from_raw_parts(src_data as *const u8, src_data_size).to_vec();
            seen.source_name = text(source_name);
            seen.macro_slots = read_macro_slots(defines);
            seen.include = include as usize;
            seen.entry_point = text(entry_point);
            seen.target = text(target);
            seen.flags1 = flags1;
            seen.flags2 = flags2;
        });
        self.produce(&self.code, code);
        self.produce(&self.errors, error_msgs);
        self.status
    }

    unsafe fn d3d_preprocess(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        source_name: LPCSTR,
        defines: *const D3D_SHADER_MACRO,
        include: *mut ID3DInclude,
        code_text: *mut *mut ID3DBlob,
        error_msgs: *mut *mut ID3DBlob,
    ) -> HRESULT {
        self.record(|seen| unsafe {
            seen.source = std::slice::from_raw_parts(src_data as *const u8, src_data_size).to_vec();
            seen.source_name = text(source_name);
            seen.macro_slots = read_macro_slots(defines);
            seen.include = include as usize;
        });
        self.produce(&self.code, code_text);
        self.produce(&self.errors, error_msgs);
        self.status
    }

    unsafe fn d3d_disassemble(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        flags: UINT,
        comments: LPCSTR,
        disassembly: *mut *mut ID3DBlob,
    ) -> HRESULT {
        self.record(|seen| unsafe {
            seen.source = std::slice::from_raw_parts(src_data as *const u8, src_data_size).to_vec();
            seen.flags1 = flags;
            seen.comment = text(comments);
        });
        self.produce(&self.code, disassembly);
        self.status
    }
}
