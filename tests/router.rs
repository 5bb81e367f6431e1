mod support;

use std::sync::Arc;

use rpc_core::{
    DispatcherConfig, Encoding, ErrorKind, HandlerSpec, OutboundSet, Procedure, Request,
    TransportUnaryOutbound, UnaryFn,
};

use support::FakeTransport;

fn upper_handler() -> HandlerSpec {
    HandlerSpec::Unary(Arc::new(UnaryFn(
        |_ctx, mut req: Request, writer: &mut rpc_core::ResponseWriter| async move {
            let body = req.body_mut().read_to_end()?;
            let upper: Vec<u8> = body.iter().map(u8::to_ascii_uppercase).collect();
            writer.write_body(upper);
            Ok(())
        },
    )))
}

/// A dispatcher can serve more than one service name out of a single
/// router, and a procedure registered under one encoding does not answer
/// a call made under another.
#[tokio::test]
async fn dispatcher_routes_by_service_procedure_and_encoding() {
    let transport = FakeTransport::new();

    let mut config = DispatcherConfig::new("gateway");
    config
        .router
        .register("shout", vec![Procedure::new("yell", Encoding::RAW, upper_handler())])
        .unwrap();
    config
        .router
        .register(
            "shout",
            vec![Procedure::new("yell", Encoding::JSON, upper_handler())],
        )
        .unwrap();
    let inbound = transport.new_inbound("gateway:0").unwrap();
    let server = rpc_core::Dispatcher::new(config.with_inbound(inbound));
    server.start().await.unwrap();

    let outbound = transport.new_single_outbound("gateway:0").unwrap();
    let mut ctx = rpc_core::Context::background();

    let raw_req = Request::builder()
        .caller("client")
        .callee("shout")
        .procedure("yell")
        .encoding(Encoding::RAW)
        .body(b"hi".to_vec())
        .unwrap();
    let mut resp = outbound.call(&mut ctx, raw_req).await.unwrap();
    assert_eq!(resp.body_mut().read_to_end().unwrap().as_ref(), b"HI");

    let json_req = Request::builder()
        .caller("client")
        .callee("shout")
        .procedure("yell")
        .encoding(Encoding::JSON)
        .body(b"hi".to_vec())
        .unwrap();
    let mut resp = outbound.call(&mut ctx, json_req).await.unwrap();
    assert_eq!(resp.body_mut().read_to_end().unwrap().as_ref(), b"HI");

    let wrong_service = Request::builder()
        .caller("client")
        .callee("other-service")
        .procedure("yell")
        .encoding(Encoding::RAW)
        .body(Vec::new())
        .unwrap();
    let err = outbound.call(&mut ctx, wrong_service).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unimplemented);

    let wrong_encoding = Request::builder()
        .caller("client")
        .callee("shout")
        .procedure("yell")
        .encoding(Encoding::PROTO)
        .body(Vec::new())
        .unwrap();
    let err = outbound.call(&mut ctx, wrong_encoding).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    server.stop().await.unwrap();
}

/// Procedures can be registered after `start`; inbounds already running
/// see the new registration through the shared router lock.
#[tokio::test]
async fn procedures_can_be_registered_after_start() {
    let transport = FakeTransport::new();
    let config = DispatcherConfig::new("svc");
    let inbound = transport.new_inbound("svc:0").unwrap();
    let server = rpc_core::Dispatcher::new(config.with_inbound(inbound));
    server.start().await.unwrap();

    let outbound = transport.new_single_outbound("svc:0").unwrap();
    let mut ctx = rpc_core::Context::background();
    let req = Request::builder()
        .caller("client")
        .callee("svc")
        .procedure("late")
        .encoding(Encoding::RAW)
        .body(Vec::new())
        .unwrap();
    let err = outbound.call(&mut ctx, req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unimplemented);

    server
        .register(vec![Procedure::new("late", Encoding::RAW, upper_handler())])
        .unwrap();

    let req = Request::builder()
        .caller("client")
        .callee("svc")
        .procedure("late")
        .encoding(Encoding::RAW)
        .body(b"ok".to_vec())
        .unwrap();
    let mut resp = outbound.call(&mut ctx, req).await.unwrap();
    assert_eq!(resp.body_mut().read_to_end().unwrap().as_ref(), b"OK");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn introspect_reflects_registration_and_outbound_wiring() {
    let transport = FakeTransport::new();
    let mut config = DispatcherConfig::new("svc");
    config
        .router
        .register("svc", vec![Procedure::new("echo", Encoding::RAW, upper_handler())])
        .unwrap();
    let inbound = transport.new_inbound("svc:1").unwrap();
    let config = config.with_inbound(inbound).with_outbound(
        "peer",
        OutboundSet {
            service: "peer".into(),
            unary: Some(transport.new_single_outbound("peer:0").unwrap()),
            oneway: None,
            stream: None,
        },
    );
    let dispatcher = rpc_core::Dispatcher::new(config);
    dispatcher.start().await.unwrap();

    let status = dispatcher.introspect().await;
    assert_eq!(status.name, "svc");
    assert_eq!(status.procedures.len(), 1);
    assert_eq!(status.procedures[0].name, "echo");
    assert_eq!(status.inbounds.len(), 1);
    assert!(status.inbounds[0].running);
    assert_eq!(status.outbounds.len(), 1);
    assert_eq!(status.outbounds[0].unary_running, Some(true));
    assert_eq!(status.outbounds[0].oneway_running, None);

    dispatcher.stop().await.unwrap();
}
