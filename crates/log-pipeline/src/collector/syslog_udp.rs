//! UDP Syslog 리스너
//!
//! RFC 3164 형식의 syslog 메시지를 UDP 소켓으로 수신합니다.
//! 데이터그램 하나를 메시지 하나로 취급하며, 수신 태스크 안에서 바로 디코딩합니다.
//!
//! 1024 미만 포트는 특권 포트이므로 기본값은 5140입니다.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use syslens_core::metrics as m;
use syslens_core::types::LogEvent;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RawDatagram;
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::parser::Rfc3164Decoder;

/// UDP syslog 리스너 설정
#[derive(Debug, Clone)]
pub struct SyslogUdpConfig {
    /// 바인드 주소 (예: "0.0.0.0:5140", 테스트에서는 "127.0.0.1:0")
    pub bind_addr: String,
    /// 최대 메시지 크기 (바이트). 이보다 큰 데이터그램은 잘립니다.
    pub max_message_size: usize,
}

impl Default for SyslogUdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5140".to_owned(),
            max_message_size: 8192,
        }
    }
}

impl From<&PipelineConfig> for SyslogUdpConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            max_message_size: config.max_message_size,
        }
    }
}

/// UDP syslog 리스너
///
/// [`SyslogUdpListener::start`]로 소켓을 바인드하고 수신 태스크를 띄웁니다.
/// 반환된 [`ListenerHandle`]로 정지합니다.
pub struct SyslogUdpListener;

impl SyslogUdpListener {
    /// 소켓을 바인드하고 수신 루프를 시작합니다.
    ///
    /// 디코딩된 이벤트마다 `on_event`가 수신 태스크에서 호출됩니다.
    /// 콜백이 블록하면 다음 데이터그램 수신이 늦어집니다.
    ///
    /// # Errors
    /// 바인드에 실패하면 [`LogPipelineError::SocketBind`]를 반환합니다.
    pub async fn start<F>(
        config: SyslogUdpConfig,
        on_event: F,
    ) -> Result<ListenerHandle, LogPipelineError>
    where
        F: Fn(LogEvent) + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind(&config.bind_addr)
            .await
            .map_err(|source| LogPipelineError::SocketBind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "UDP syslog listener bound");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            socket,
            config.max_message_size,
            cancel.clone(),
            on_event,
        ));

        Ok(ListenerHandle {
            local_addr,
            cancel,
            task: Some(task),
        })
    }
}

/// 연속 수신 에러 후 최초 대기 시간
const RECV_BACKOFF_INITIAL: Duration = Duration::from_millis(10);

/// 연속 수신 에러 대기 시간 상한
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// 연속된 `recv_from` 에러 추적
///
/// 첫 에러는 바로 다음 수신을 시도하고, 이어지는 에러마다 대기 시간을
/// 두 배로 늘립니다(상한 [`RECV_BACKOFF_MAX`]). 경고 로그는 연속 구간의
/// 첫 에러와 2의 거듭제곱 번째 에러에서만 남깁니다.
#[derive(Debug, Default)]
struct RecvErrorBackoff {
    streak: u64,
}

impl RecvErrorBackoff {
    /// 에러를 기록하고 (경고 여부, 다음 수신 전 대기 시간)을 반환합니다.
    fn on_error(&mut self) -> (bool, Duration) {
        self.streak += 1;
        let warn = self.streak.is_power_of_two();
        let delay = if self.streak == 1 {
            Duration::ZERO
        } else {
            let doublings = u32::try_from(self.streak - 2).unwrap_or(u32::MAX).min(16);
            RECV_BACKOFF_INITIAL
                .saturating_mul(1 << doublings)
                .min(RECV_BACKOFF_MAX)
        };
        (warn, delay)
    }

    /// 수신 성공 시 호출합니다. 끝난 에러 구간의 길이를 반환합니다.
    fn on_success(&mut self) -> Option<u64> {
        (self.streak > 0).then(|| std::mem::take(&mut self.streak))
    }
}

async fn receive_loop<F>(
    socket: UdpSocket,
    max_message_size: usize,
    cancel: CancellationToken,
    on_event: F,
) where
    F: Fn(LogEvent) + Send + Sync + 'static,
{
    let decoder = Rfc3164Decoder::new();
    let mut buf = vec![0u8; max_message_size.max(1)];
    let mut backoff = RecvErrorBackoff::default();

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, source)) => {
                        if let Some(errors) = backoff.on_success() {
                            if errors > 1 {
                                info!(errors, "UDP receive recovered");
                            }
                        }
                        counter!(m::DATAGRAMS_RECEIVED_TOTAL).increment(1);
                        let datagram =
                            RawDatagram::new(Bytes::copy_from_slice(&buf[..len]), source);
                        let event = decoder.decode(&datagram);
                        if !event.parse_ok {
                            counter!(m::DECODE_FALLBACKS_TOTAL).increment(1);
                            debug!(%source, len, "datagram did not fully decode");
                        }
                        on_event(event);
                    }
                    Err(e) => {
                        // 잘린 데이터그램, ICMP port unreachable 등. 다음 데이터그램은 계속 수신
                        let (log_warn, delay) = backoff.on_error();
                        if log_warn {
                            warn!(error = %e, consecutive = backoff.streak, "UDP receive error");
                        } else {
                            debug!(error = %e, consecutive = backoff.streak, "UDP receive error");
                        }
                        if !delay.is_zero() {
                            tokio::select! {
                                () = tokio::time::sleep(delay) => {}
                                () = cancel.cancelled() => {
                                    info!("UDP syslog listener received shutdown signal");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!("UDP syslog listener received shutdown signal");
                break;
            }
        }
    }
}

/// 실행 중인 리스너 핸들
///
/// 핸들이 drop되면 수신 태스크도 취소됩니다.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// 실제로 바인드된 주소 (포트 0으로 바인드한 경우 OS가 할당한 포트)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 수신 태스크가 아직 실행 중인지 확인합니다.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// 수신 루프를 멈추고 태스크가 끝날 때까지 기다립니다.
    ///
    /// 반환 시점에 소켓은 이미 닫혀 있습니다.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "UDP listener task ended abnormally");
            }
        }
        info!(local_addr = %self.local_addr, "UDP syslog listener stopped");
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn loopback() -> SyslogUdpConfig {
        SyslogUdpConfig {
            bind_addr: "127.0.0.1:0".to_owned(),
            ..Default::default()
        }
    }

    async fn start_collecting(
        config: SyslogUdpConfig,
    ) -> (ListenerHandle, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SyslogUdpListener::start(config, move |event| {
            let _ = tx.send(event);
        })
        .await
        .unwrap();
        (handle, rx)
    }

    #[test]
    fn default_config() {
        let config = SyslogUdpConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:5140");
        assert_eq!(config.max_message_size, 8192);
    }

    #[test]
    fn config_from_pipeline() {
        let pipeline = PipelineConfig {
            bind_addr: "127.0.0.1:5514".to_owned(),
            max_message_size: 2048,
            ..Default::default()
        };
        let config = SyslogUdpConfig::from(&pipeline);
        assert_eq!(config.bind_addr, "127.0.0.1:5514");
        assert_eq!(config.max_message_size, 2048);
    }

    #[tokio::test]
    async fn receives_and_decodes_datagram() {
        let (handle, mut rx) = start_collecting(loopback()).await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(
                b"<34>Oct 11 22:14:15 mymachine su: 'su root' failed for lonvick",
                handle.local_addr(),
            )
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event should arrive")
            .unwrap();
        assert!(event.parse_ok);
        assert_eq!(event.hostname.as_deref(), Some("mymachine"));
        assert_eq!(event.process.as_deref(), Some("su"));
        assert_eq!(event.source, sender.local_addr().unwrap());

        handle.stop().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_socket_bind_error() {
        let occupied = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = SyslogUdpConfig {
            bind_addr: occupied.local_addr().unwrap().to_string(),
            ..Default::default()
        };

        let result = SyslogUdpListener::start(config, |_| {}).await;
        assert!(matches!(result, Err(LogPipelineError::SocketBind { .. })));
    }

    #[tokio::test]
    async fn oversized_datagram_is_truncated() {
        let config = SyslogUdpConfig {
            max_message_size: 16,
            ..loopback()
        };
        let (handle, mut rx) = start_collecting(config).await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let payload = vec![b'x'; 200];
        sender.send_to(&payload, handle.local_addr()).await.unwrap();

        // 플랫폼에 따라 잘린 데이터그램이 전달되거나 수신 에러로 버려짐
        if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
            assert!(event.raw_message.len() <= 16);
        }
        handle.stop().await;
    }

    #[test]
    fn recv_error_backoff_grows_and_resets() {
        let mut backoff = RecvErrorBackoff::default();

        // 첫 에러: 바로 재시도, 경고
        assert_eq!(backoff.on_error(), (true, Duration::ZERO));
        // 이어지는 에러: 대기 시간 두 배씩
        assert_eq!(backoff.on_error(), (true, Duration::from_millis(10)));
        assert_eq!(backoff.on_error(), (false, Duration::from_millis(20)));
        assert_eq!(backoff.on_error(), (true, Duration::from_millis(40)));

        for _ in 0..100 {
            backoff.on_error();
        }
        let (_, delay) = backoff.on_error();
        assert_eq!(delay, RECV_BACKOFF_MAX);

        // 성공하면 구간 길이를 보고하고 초기화
        assert_eq!(backoff.on_success(), Some(105));
        assert_eq!(backoff.on_success(), None);
        assert_eq!(backoff.on_error(), (true, Duration::ZERO));
    }

    #[test]
    fn recv_error_warnings_are_rate_limited() {
        let mut backoff = RecvErrorBackoff::default();
        let warnings = (0..1000).filter(|_| backoff.on_error().0).count();
        // 1, 2, 4, ..., 512
        assert_eq!(warnings, 10);
    }

    #[tokio::test]
    async fn stop_releases_socket() {
        let (handle, _rx) = start_collecting(loopback()).await;
        let addr = handle.local_addr();
        assert!(handle.is_running());

        handle.stop().await;

        // 같은 주소에 다시 바인드 가능
        let rebound = UdpSocket::bind(addr).await;
        assert!(rebound.is_ok());
    }
}
