//! 로그 수집 모듈 -- UDP로 syslog 데이터그램을 수신합니다.
//!
//! # 수집 소스
//! - [`SyslogUdpListener`]: UDP syslog 수신 (RFC 3164, 데이터그램 하나 = 메시지 하나)
//!
//! # 아키텍처
//! 수신 루프는 자체 tokio 태스크에서 실행되며, 데이터그램마다 [`RawDatagram`]을 만들어
//! 그 자리에서 디코딩한 뒤 결과 `LogEvent`를 콜백으로 넘깁니다.
//! 콜백은 블로킹하지 않아야 합니다 (파이프라인은 큐에 넣기만 합니다).

pub mod syslog_udp;

pub use syslog_udp::{ListenerHandle, SyslogUdpConfig, SyslogUdpListener};

use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, Local};

/// 수신된 원시 데이터그램
///
/// 리스너가 생성하고 디코더가 곧바로 소비하는 중간 데이터입니다. 저장되지 않습니다.
#[derive(Debug, Clone)]
pub struct RawDatagram {
    /// 페이로드 바이트
    pub data: Bytes,
    /// 송신자 주소
    pub source: SocketAddr,
    /// 수신 시각
    pub received_at: DateTime<Local>,
}

impl RawDatagram {
    /// 현재 시각으로 새 RawDatagram을 생성합니다.
    pub fn new(data: Bytes, source: SocketAddr) -> Self {
        Self {
            data,
            source,
            received_at: Local::now(),
        }
    }

    /// 수신 시각을 지정합니다.
    pub fn with_received_at(mut self, received_at: DateTime<Local>) -> Self {
        self.received_at = received_at;
        self
    }
}
