#![no_main]

use std::net::{Ipv4Addr, SocketAddr};

use arbitrary::Arbitrary;
use chrono::Local;
use libfuzzer_sys::fuzz_target;
use syslens_core::types::{LogEvent, Priority};
use syslens_log_pipeline::filter::EventFilter;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 필터 쿼리 원문
    query: String,
    /// 평가 대상 이벤트 필드값
    priority: Option<u8>,
    hostname: Option<String>,
    process: Option<String>,
    pid: Option<u32>,
    message: String,
}

fuzz_target!(|input: FuzzInput| {
    // 컴파일은 패닉 없이 Ok 또는 Err
    let filter = match EventFilter::compile(&input.query) {
        Ok(filter) => filter,
        Err(e) => {
            // 오류 위치는 쿼리 범위 안
            assert!(e.position <= input.query.len());
            let _ = e.caret(&input.query);
            return;
        }
    };

    let source = SocketAddr::from((Ipv4Addr::new(10, 0, 0, 5), 514));
    let mut event = LogEvent::unparsed(input.message.clone(), source, Local::now());
    event.priority = input.priority.and_then(Priority::new);
    event.hostname = input.hostname;
    event.process = input.process;
    event.pid = input.pid;
    event.message = input.message;

    // 같은 이벤트에 대해 평가는 결정적
    let first = filter.matches(&event);
    assert_eq!(first, filter.matches(&event));

    // 재컴파일한 필터도 같은 결과
    let again = EventFilter::compile(filter.query()).expect("accepted query must recompile");
    assert_eq!(first, again.matches(&event));
});
