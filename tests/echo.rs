mod support;

use std::sync::Arc;

use rpc_core::{
    DispatcherConfig, Encoding, HandlerSpec, OutboundSet, Procedure, Request, TransportOnewayOutbound,
    TransportUnaryOutbound, UnaryFn,
};

use support::FakeTransport;

fn echo_handler() -> HandlerSpec {
    HandlerSpec::Unary(Arc::new(UnaryFn(
        |_ctx, mut req: rpc_core::Request, writer: &mut rpc_core::ResponseWriter| async move {
            let body = req.body_mut().read_to_end()?;
            writer.write_body(body.to_vec());
            Ok(())
        },
    )))
}

#[tokio::test]
async fn unary_call_round_trips_through_router_and_transport() {
    let transport = FakeTransport::new();

    let mut server_config = DispatcherConfig::new("server");
    server_config
        .router
        .register("server", vec![Procedure::new("echo", Encoding::RAW, echo_handler())])
        .unwrap();
    let inbound = transport.new_inbound("server:0").unwrap();
    let server_config = server_config.with_inbound(inbound);
    let server = rpc_core::Dispatcher::new(server_config);
    server.start().await.unwrap();

    let unary_outbound = transport.new_single_outbound("server:0").unwrap();
    let client_config = DispatcherConfig::new("client").with_outbound(
        "server",
        OutboundSet {
            service: "server".into(),
            unary: Some(unary_outbound),
            oneway: None,
            stream: None,
        },
    );
    let client = rpc_core::Dispatcher::new(client_config);
    client.start().await.unwrap();

    let cc = client.client_config("server").unwrap();
    let outbound = cc.unary_outbound().expect("configured with a unary endpoint");

    let mut ctx = rpc_core::Context::background();
    let req = Request::builder()
        .caller("client")
        .callee("server")
        .procedure("echo")
        .encoding(Encoding::RAW)
        .body(b"hello".to_vec())
        .unwrap();
    let mut resp = outbound.call(&mut ctx, req).await.unwrap();
    let body = resp.body_mut().read_to_end().unwrap();
    assert_eq!(body.as_ref(), b"hello");

    client.stop().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn unregistered_procedure_surfaces_as_unimplemented() {
    let transport = FakeTransport::new();
    let server_config = DispatcherConfig::new("server");
    let inbound = transport.new_inbound("server:1").unwrap();
    let server = rpc_core::Dispatcher::new(server_config.with_inbound(inbound));
    server.start().await.unwrap();

    let unary_outbound = transport.new_single_outbound("server:1").unwrap();
    let mut ctx = rpc_core::Context::background();
    let req = Request::builder()
        .caller("client")
        .callee("server")
        .procedure("missing")
        .encoding(Encoding::RAW)
        .body(Vec::new())
        .unwrap();
    let err = unary_outbound.call(&mut ctx, req).await.unwrap_err();
    assert_eq!(err.kind(), rpc_core::ErrorKind::Unimplemented);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn oneway_call_is_accepted_and_runs_asynchronously() {
    let transport = FakeTransport::new();
    let ran = Arc::new(tokio::sync::Notify::new());
    let ran_handler = ran.clone();

    let mut server_config = DispatcherConfig::new("server");
    server_config
        .router
        .register(
            "server",
            vec![Procedure::new(
                "fire",
                Encoding::RAW,
                HandlerSpec::Oneway(Arc::new(rpc_core::OnewayFn(move |_ctx, _req| {
                    let ran_handler = ran_handler.clone();
                    async move {
                        ran_handler.notify_one();
                        Ok(())
                    }
                }))),
            )],
        )
        .unwrap();
    let inbound = transport.new_inbound("server:2").unwrap();
    let server = rpc_core::Dispatcher::new(server_config.with_inbound(inbound));
    server.start().await.unwrap();

    let oneway_outbound = transport.endpoint_to("server:2");
    let mut ctx = rpc_core::Context::background();
    let req = Request::builder()
        .caller("client")
        .callee("server")
        .procedure("fire")
        .encoding(Encoding::RAW)
        .body(Vec::new())
        .unwrap();
    oneway_outbound.call_oneway(&mut ctx, req).await.unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(1), ran.notified())
        .await
        .expect("oneway handler should have run");

    server.stop().await.unwrap();
}
