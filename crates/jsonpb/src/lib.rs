//! Streams arbitrarily-chunked JSON bytes through a protobuf schema,
//! producing typed field events instead of an intermediate `serde_json`
//! tree.
//!
//! ```ignore
//! use jsonpb::{DynamicMessageSink, Parser, ParserOptions};
//!
//! let desc: prost_reflect::MessageDescriptor = /* from a DescriptorPool */;
//! let mut parser = Parser::new(desc, DynamicMessageSink::new(), ParserOptions::default());
//! parser.feed(br#"{"name": "widg"#)?;
//! parser.feed(br#"et", "count": 3}"#)?;
//! let message = parser.finish()?.into_message();
//! # Ok::<(), jsonpb::ParserError>(())
//! ```
//!
//! Implement [`ProtoSink`] to drive something other than an in-memory
//! [`prost_reflect::DynamicMessage`] tree: a typed builder, a columnar
//! writer, anything that can accept field events in push/pop order.

mod base64;
mod driver;
mod dynamic_sink;
mod error;
mod escape;
mod frame;
#[cfg(feature = "fuzzing")]
pub mod fuzzing;
mod numbers;
mod options;
mod schema;
mod sink;
mod wellknown;

pub use driver::Parser;
pub use dynamic_sink::DynamicMessageSink;
pub use error::{ErrorKind, ParserError};
pub use options::ParserOptions;
pub use sink::{ProtoSink, ScalarValue};
