//! Container primitives for the SIP support libraries.
//!
//! The centre piece is a byte ring buffer over pluggable [`Storage`]
//! backends (in-memory array or persistent file), with two layered variants:
//! fixed-size chunks and size-prefixed variable chunks. Next to the rings
//! live the reference-counted [`SharedBufferPool`] and the bounded blocking
//! [`ReferenceQueue`] used to pass pooled buffers between threads.
//!
//! The rings themselves are deliberately not thread-safe; cross-thread use
//! goes through the queue or the pool, both of which are.

pub mod bounded_string;
pub mod chunked;
pub mod reference_queue;
pub mod ring_buffer;
pub mod shared_buffer;
pub mod storage;
pub mod variable_chunked;

pub use bounded_string::BoundedString;
pub use chunked::{CHUNK_HEADER_SIZE, ChunkedRingBuffer};
pub use reference_queue::{ReceiveTimeout, ReferenceQueue, SendTimeout};
pub use ring_buffer::{RingBuffer, RingError};
pub use shared_buffer::{ConstSharedBufferPointer, SharedBufferPointer, SharedBufferPool};
pub use storage::{ArrayStorage, DirectStorage, FileStorage, Storage, StorageError};
pub use variable_chunked::{ChunkError, VariableChunkedRingBuffer, best_effort_prefix};
