//! Name-based recognition of channel operations.
//!
//! All of this operates on demangled symbol strings. The demangler keeps the
//! generic parameter placeholders (`Sender<T>`) and the trailing hash
//! segment, which is what makes the closure-rejection suffix rule work: a
//! genuine `send` ends in `::send::h<hash>` while a closure nested inside it
//! ends in `::send::{{closure}}::h<hash>`.

/// `send` methods on the intra-process and IPC sender structs.
pub const SEND_MARKERS: &[&str] =
    &["<std::sync::mpsc::Sender<T>>::send::", "<ipc_channel::ipc::IpcSender<T>>::send::"];

/// `recv` and `try_recv` on the corresponding receiver structs.
pub const RECV_MARKERS: &[&str] = &[
    "<std::sync::mpsc::Receiver<T>>::recv::",
    "<std::sync::mpsc::Receiver<T>>::try_recv::",
    "<ipc_channel::ipc::IpcReceiver<T>>::recv::",
    "<ipc_channel::ipc::IpcReceiver<T>>::try_recv::",
];

pub const RESULT_UNWRAP_MARKER: &str = "<core::result::Result<T, E>>::unwrap::";

/// Channel-handle struct prefixes the carried type is extracted from.
pub const SENDER_TYPE_PREFIXES: &[&str] =
    &["std::sync::mpsc::Sender<", "ipc_channel::ipc::IpcSender<"];
pub const RECEIVER_TYPE_PREFIXES: &[&str] =
    &["std::sync::mpsc::Receiver<", "ipc_channel::ipc::IpcReceiver<"];

/// The multi-way select handle. A receive through it carries its payload
/// type in the last call argument instead of the handle struct.
pub const SELECT_STRUCT: &str = "std::sync::mpsc::Select";

/// Scope prefixes the guided walker never descends into.
pub const IGNORABLE_SCOPE_PREFIXES: &[&str] = &["core::", "<core::", "alloc::", "<alloc::"];

fn matches_marker(demangled: &str, marker: &str) -> bool {
    match demangled.find(marker) {
        // a further `::` after the match means we are looking at a closure
        // defined inside the channel method, not the method itself
        Some(pos) => !demangled[pos + marker.len()..].contains("::"),
        None => false,
    }
}

pub fn is_send(demangled: &str) -> bool {
    SEND_MARKERS.iter().any(|marker| matches_marker(demangled, marker))
}

pub fn is_recv(demangled: &str) -> bool {
    RECV_MARKERS.iter().any(|marker| matches_marker(demangled, marker))
}

pub fn is_result_unwrap(demangled: &str) -> bool {
    demangled.contains(RESULT_UNWRAP_MARKER)
}

/// True for callees living in the standard library or allocator scopes.
pub fn is_std_scope(demangled: &str) -> bool {
    IGNORABLE_SCOPE_PREFIXES.iter().any(|prefix| demangled.starts_with(prefix))
}

fn carried_type<'a>(struct_name: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    for prefix in prefixes {
        if let Some(inner) = struct_name.strip_prefix(prefix) {
            // strip at the last `>` so nested generics survive
            return Some(&inner[..inner.rfind('>')?])
        }
    }
    None
}

/// Extracts `T` out of a sender struct name like `std::sync::mpsc::Sender<T>`.
pub fn sent_type(struct_name: &str) -> Option<&str> {
    carried_type(struct_name, SENDER_TYPE_PREFIXES)
}

/// Extracts `T` out of a receiver struct name.
pub fn received_type(struct_name: &str) -> Option<&str> {
    carried_type(struct_name, RECEIVER_TYPE_PREFIXES)
}

pub fn is_select_struct(struct_name: &str) -> bool {
    struct_name == SELECT_STRUCT
}
