//! Caller-side interpretation of every failure shape.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::promise_callee;
use wxrpc::mock::{MockChannel, PromiseBehavior};
use wxrpc::{make_remote_callable, CallOptions, Functions, PeerId, Transport};

fn proxy_over(channel: Arc<MockChannel>, options: CallOptions) -> wxrpc::RemoteFunction {
    let transport = Arc::new(Transport::promise(channel));
    make_remote_callable(transport, "remote_func", options)
}

#[tokio::test]
async fn test_no_response_names_the_background_script() {
    // Default behavior of a fresh channel is "no reply".
    let proxy = proxy_over(MockChannel::new(), CallOptions::default());
    let err = proxy.call0().await.unwrap_err();

    assert!(err.is_rpc());
    assert_eq!(
        err.message(),
        "Got no response when trying to call 'remote_func'. \
         Did you enable RPC in the background script?"
    );
}

#[tokio::test]
async fn test_no_response_names_the_content_script_when_addressed() {
    let channel = MockChannel::new();
    channel.script_peer(PeerId(1), PromiseBehavior::NoReply);

    let proxy = proxy_over(channel, CallOptions::addressed_to(PeerId(1)));
    let err = proxy.call0().await.unwrap_err();

    assert!(err.is_rpc());
    assert!(err.message().contains("Got no response"));
    assert!(err.message().contains("the tab's content script"));
}

#[tokio::test]
async fn test_send_failure_reads_as_no_response() {
    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::SendFailure);

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    // The underlying transport detail is intentionally discarded.
    assert!(err.is_rpc());
    assert!(err.message().contains("Got no response"));
}

#[tokio::test]
async fn test_untagged_reply_is_an_interfering_listener() {
    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::Scripted(json!(
        "some unexpected return value"
    )));

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    assert!(err.is_rpc());
    assert!(err.message().contains("interfering listener"));
    assert!(err.message().contains("remote_func"));
}

#[tokio::test]
async fn test_null_reply_is_an_interfering_listener() {
    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::Scripted(Value::Null));

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    assert!(err.is_rpc());
    assert!(err.message().contains("interfering listener"));
}

#[tokio::test]
async fn test_unknown_function_is_a_dispatch_error_not_no_response() {
    let (_ctx, callee_channel) = promise_callee(Functions::new());

    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::DeliverTo(callee_channel));

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    assert!(err.is_rpc());
    assert_eq!(
        err.message(),
        "No such function registered for RPC: remote_func"
    );
    assert!(!err.message().contains("no response"));
}

#[tokio::test]
async fn test_handler_error_surfaces_as_remote_error_verbatim() {
    let functions = Functions::new().register_plain("remote_func", |_args| async {
        Err("Remote function error".to_string())
    });
    let (_ctx, callee_channel) = promise_callee(functions);

    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::DeliverTo(callee_channel));

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(err.message(), "Remote function error");
}

fn explode() -> Result<Value, String> {
    panic!("kaboom")
}

fn precheck() -> bool {
    panic!("sync boom")
}

#[tokio::test]
async fn test_panic_before_the_future_exists_surfaces_as_remote_error() {
    // The handler panics while building its future, before anything
    // can be awaited.
    let functions = Functions::new().register("remote_func", |_sender, _args| {
        let _ok = precheck();
        async { Ok(Value::Null) }
    });
    let (_ctx, callee_channel) = promise_callee(functions);

    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::DeliverTo(callee_channel));

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(err.message(), "sync boom");
}

#[tokio::test]
async fn test_handler_panic_surfaces_as_remote_error() {
    let functions =
        Functions::new().register_plain("remote_func", |_args| async move { explode() });
    let (_ctx, callee_channel) = promise_callee(functions);

    let channel = MockChannel::new();
    channel.script_default(PromiseBehavior::DeliverTo(callee_channel));

    let err = proxy_over(channel, CallOptions::default())
        .call0()
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(err.message(), "kaboom");
}
