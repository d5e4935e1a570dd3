#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: UDP syslog 리스너
//! - [`parser`]: PRI 디코더와 RFC 3164 메시지 디코더
//! - [`filter`]: 필터 쿼리 언어 (렉서, 파서, 평가기, 원자적 교체)
//! - [`buffer`]: 소비자별 유한 이벤트 큐
//! - [`sink`]: 콘솔 싱크, 일별 JSON lines 파일 싱크
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입

pub mod buffer;
pub mod config;
pub mod error;
pub mod pipeline;

pub mod collector;
pub mod filter;
pub mod parser;
pub mod sink;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{LogPipeline, LogPipelineBuilder};

// 설정
pub use config::{DropPolicy, PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::Rfc3164Decoder;

// 필터
pub use filter::{ActiveFilter, EventFilter, FilterExpression, FilterSyntaxError, SeverityThreshold};

// 수집기
pub use collector::{ListenerHandle, RawDatagram, SyslogUdpConfig, SyslogUdpListener};

// 싱크
pub use sink::{ConsoleSink, DailyFileSink};

// 큐
pub use buffer::EventQueue;
