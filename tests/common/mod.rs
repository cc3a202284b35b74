//! Shared test wiring: in-memory callee processes and caller proxies.

#![allow(dead_code)]

use std::sync::Arc;

use wxrpc::mock::{MockCallbackChannel, MockChannel};
use wxrpc::{expose_for_rpc, Functions, RpcContext, Transport};

/// Stand up an executing side on a promise-convention channel: a
/// fresh context with the given functions exposed and the dispatcher
/// attached to the returned channel.
pub fn promise_callee(functions: Functions) -> (Arc<RpcContext>, Arc<MockChannel>) {
    let ctx = Arc::new(RpcContext::new());
    let channel = MockChannel::new();
    let transport = Transport::promise(channel.clone());
    expose_for_rpc(&ctx, &transport, functions);
    (ctx, channel)
}

/// Stand up an executing side on a callback-convention channel.
pub fn callback_callee(functions: Functions) -> (Arc<RpcContext>, Arc<MockCallbackChannel>) {
    let ctx = Arc::new(RpcContext::new());
    let channel = MockCallbackChannel::new();
    let transport = Transport::callback(channel.clone());
    expose_for_rpc(&ctx, &transport, functions);
    (ctx, channel)
}
