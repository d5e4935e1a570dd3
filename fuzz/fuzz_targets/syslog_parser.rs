#![no_main]

use std::net::{Ipv4Addr, SocketAddr};

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use syslens_log_pipeline::collector::RawDatagram;
use syslens_log_pipeline::parser::Rfc3164Decoder;
use syslens_log_pipeline::sink::DailyRecord;

fuzz_target!(|data: &[u8]| {
    let source = SocketAddr::from((Ipv4Addr::LOCALHOST, 514));
    let datagram = RawDatagram::new(Bytes::copy_from_slice(data), source);

    // 어떤 입력이든 패닉 없이 이벤트가 나와야 한다
    let event = Rfc3164Decoder::new().decode(&datagram);

    if !event.raw_message.is_empty() {
        assert!(!event.message.is_empty());
    }
    if event.parse_ok {
        assert!(event.hostname.is_some() && event.process.is_some());
    }
    if let Some(priority) = event.priority {
        assert!(priority.value() <= 191);
        assert_eq!(priority.facility().code(), priority.value() / 8);
        assert_eq!(priority.severity().code(), priority.value() % 8);
    }

    // 일별 파일 레코드로 직렬화할 수 있어야 한다
    let record = DailyRecord::from(&event);
    let line = serde_json::to_string(&record).expect("record must serialize");
    assert!(!line.contains('\n'));
});
