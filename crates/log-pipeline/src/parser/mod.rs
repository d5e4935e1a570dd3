//! 메시지 디코딩 모듈 -- RFC 3164 syslog와 PRI 디코더
//!
//! - [`priority`]: `<N>` 태그 분리, facility/severity 분해
//! - [`rfc3164`]: 데이터그램을 [`LogEvent`](syslens_core::types::LogEvent)로 디코딩
//!
//! # 사용 예시
//! ```ignore
//! use syslens_log_pipeline::parser::{Rfc3164Decoder, priority};
//!
//! assert_eq!(priority::decode(34), Some((Facility::Auth, Severity::Critical)));
//! let event = Rfc3164Decoder::new().decode(&datagram);
//! ```

pub mod priority;
pub mod rfc3164;

pub use rfc3164::Rfc3164Decoder;
