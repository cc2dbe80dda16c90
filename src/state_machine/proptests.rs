//! Property-based tests for the state machine
//!
//! Arbitrary event sequences are driven through `transition` + `apply` and the
//! conversation invariants are checked after every step.

use super::state::*;
use super::transition::*;
use super::*;
use crate::llm::{ErrorInfo, ErrorKind, Reply};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::RateLimited),
        Just(ErrorKind::HttpError),
        Just(ErrorKind::NetworkError),
        Just(ErrorKind::ExhaustedRetries),
        Just(ErrorKind::InvalidResponse),
        Just(ErrorKind::InvalidRequest),
    ]
}

fn arb_error() -> impl Strategy<Value = ErrorInfo> {
    (arb_error_kind(), "[a-zA-Z ]{1,30}", proptest::option::of(400u16..600)).prop_map(
        |(kind, message, status_code)| ErrorInfo {
            kind,
            message,
            status_code,
        },
    )
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[ \t\n]{1,5}",
        "[a-zA-Z0-9 ?]{1,40}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|text| Event::UserSubmit { text }),
        "[a-zA-Z ]{1,40}".prop_map(|text| Event::ReplyReceived {
            reply: Reply::text(text)
        }),
        arb_error().prop_map(|error| Event::RequestFailed { error }),
    ]
}

fn step(conv: &mut ConversationState, event: Event) -> Result<Applied, TransitionError> {
    let result = transition(conv.state, event)?;
    Ok(conv.apply(result))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The log only grows and existing entries never change
    #[test]
    fn prop_log_is_append_only(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut conv = ConversationState::default();
        for event in events {
            let before = conv.messages.clone();
            let _ = step(&mut conv, event);
            prop_assert!(conv.messages.len() >= before.len());
            prop_assert_eq!(&conv.messages[..before.len()], &before[..]);
        }
    }

    /// Rejected events leave the conversation exactly as it was
    #[test]
    fn prop_rejection_is_noop(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut conv = ConversationState::default();
        for event in events {
            let before = conv.clone();
            if step(&mut conv, event).is_err() {
                prop_assert_eq!(&conv, &before);
            }
        }
    }

    /// Blank input never appends and never flips pending
    #[test]
    fn prop_blank_submit_ignored(blank in "[ \t\n]{0,5}", pending in any::<bool>()) {
        let mut conv = ConversationState::default();
        if pending {
            conv.state = ConvState::AwaitingReply;
        }
        let before = conv.clone();
        let result = step(&mut conv, Event::UserSubmit { text: blank });
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyMessage);
        prop_assert_eq!(conv, before);
    }

    /// At most one request is ever requested per pending period
    #[test]
    fn prop_single_flight(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut conv = ConversationState::default();
        let mut in_flight = false;
        for event in events {
            if let Ok(applied) = step(&mut conv, event) {
                if applied.request.is_some() {
                    prop_assert!(!in_flight, "second request while one is in flight");
                    in_flight = true;
                }
                if !conv.pending() {
                    in_flight = false;
                }
            }
            prop_assert_eq!(in_flight, conv.pending());
        }
    }

    /// A full cycle grows the log by two on success and by one on failure
    #[test]
    fn prop_cycle_growth(text in "[a-z]{1,10}", reply in "[a-z]{1,10}", fail in any::<bool>(), error in arb_error()) {
        let mut conv = ConversationState::with_seed(vec![Message::assistant(Reply::text("Hello!"))]);
        step(&mut conv, Event::UserSubmit { text: text.clone() }).unwrap();
        prop_assert!(conv.pending());

        let settle = if fail {
            Event::RequestFailed { error: error.clone() }
        } else {
            Event::ReplyReceived { reply: Reply::text(reply.clone()) }
        };
        step(&mut conv, settle).unwrap();

        prop_assert!(!conv.pending());
        prop_assert_eq!(conv.messages[1].sender, Sender::User);
        prop_assert_eq!(&conv.messages[1].text, &text);
        if fail {
            prop_assert_eq!(conv.messages.len(), 2);
            prop_assert_eq!(conv.last_error, Some(error));
        } else {
            prop_assert_eq!(conv.messages.len(), 3);
            prop_assert_eq!(conv.messages[2].sender, Sender::Assistant);
            prop_assert_eq!(&conv.messages[2].text, &reply);
            prop_assert_eq!(conv.last_error, None);
        }
    }

    /// A new submission clears the previous error
    #[test]
    fn prop_submit_clears_error(error in arb_error(), text in "[a-z]{1,10}") {
        let mut conv = ConversationState {
            last_error: Some(error),
            ..ConversationState::default()
        };
        let applied = step(&mut conv, Event::UserSubmit { text }).unwrap();
        prop_assert!(applied.error_changed);
        prop_assert_eq!(conv.last_error, None);
    }
}
