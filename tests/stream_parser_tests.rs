use foliochat::api::stream::StreamParser;
use foliochat::types::StreamEvent;

#[test]
fn test_fragmented_records() {
    let mut parser = StreamParser::new();

    let chunk1 = b"data: {\"type\":\"content";
    let events1 = parser.process(chunk1).expect("first chunk parse");
    assert_eq!(events1.len(), 0);

    let chunk2 = b"\",\"content\":\"Hi\"}\n\n";
    let events2 = parser.process(chunk2).expect("second chunk parse");
    assert_eq!(
        events2,
        vec![StreamEvent::Content {
            content: "Hi".to_string()
        }]
    );
}

#[test]
fn test_parse_error_handling() {
    let mut parser = StreamParser::new();

    let chunk = b"data: {invalid json}\n\n";
    let events = parser.process(chunk).expect("process tolerates bad json");
    assert!(events.is_empty());

    // The decoder keeps going after a malformed record.
    let events = parser
        .process(b"data: {\"type\":\"done\"}\n\n")
        .expect("later records still decode");
    assert_eq!(events, vec![StreamEvent::Done]);
}

#[test]
fn test_chunking_invariance() {
    let body = concat!(
        "data: {\"type\":\"content\",\"content\":\"Hello \"}\n\n",
        "data: {\"type\":\"content\",\"content\":\"caf\u{e9} na\u{ef}ve \u{1f980}\"}\n\n",
        "data: {\"type\":\"skill_detail\",\"skill\":{\"name\":\"Rust\"}}\n\n",
        "data: [DONE]\n\n",
        "data: {\"type\":\"done\"}\n\n",
    )
    .as_bytes();

    let mut whole = StreamParser::new();
    let expected = whole.process(body).expect("whole-body parse");
    assert_eq!(expected.len(), 4);
    assert_eq!(
        expected[1],
        StreamEvent::Content {
            content: "caf\u{e9} na\u{ef}ve \u{1f980}".to_string()
        }
    );

    for split_size in [1, 2, 3, 7, 16] {
        let mut parser = StreamParser::new();
        let mut events = Vec::new();
        for chunk in body.chunks(split_size) {
            events.extend(parser.process(chunk).expect("chunked parse"));
        }
        events.extend(parser.finish());
        assert_eq!(events, expected, "split_size={split_size}");
    }
}

#[test]
fn test_unknown_event_types_pass_through_as_unknown() {
    let mut parser = StreamParser::new();
    let events = parser
        .process(b"data: {\"type\":\"context\",\"context\":[1,2]}\n\n")
        .expect("unknown type decodes");
    assert_eq!(events, vec![StreamEvent::Unknown]);
}
