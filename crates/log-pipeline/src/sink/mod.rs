//! 이벤트 싱크 -- 필터를 통과한 이벤트의 최종 목적지
//!
//! - [`ConsoleSink`]: 사람이 읽는 한 줄 형식으로 출력 (표시 협력자)
//! - [`DailyFileSink`]: 로컬 날짜별 JSON lines 파일에 저장 (저장 협력자)
//!
//! 둘 다 core의 [`EventSink`](syslens_core::pipeline::EventSink)를 구현하며,
//! 파이프라인이 싱크마다 전용 소비자 태스크를 띄워 순서대로 호출합니다.

pub mod console;
pub mod daily;

pub use console::ConsoleSink;
pub use daily::{DailyFileSink, DailyRecord};
