use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use modroute::{DispatchConfig, Dispatcher, RequestView, WsEvent};
use std::hint::black_box;

fn example_modules() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "zoo.xqm",
            r#"
declare %rest:path("/") %rest:GET function zoo:root() { () };
declare %rest:path("/zoo/animals") %rest:GET function zoo:animals() { () };
declare %rest:path("/zoo/animals") %rest:POST %rest:consumes("application/json") function zoo:create() { () };
declare %rest:path("/zoo/animals/{$id}") %rest:GET %rest:produces("application/json") function zoo:animal-json($id) { () };
declare %rest:path("/zoo/animals/{$id}") %rest:GET %rest:produces("text/xml;qs=0.8") function zoo:animal-xml($id) { () };
declare %rest:path("/zoo/animals/{$id}/toys/{$toy}") %rest:GET function zoo:toy($id, $toy) { () };
declare %rest:path("/zoo/{$category}/animals/{$id}/habitats/{$habitat}/sections/{$section}")
  function zoo:section($category, $id, $habitat, $section) { () };
"#,
        ),
        (
            "inventory.xqm",
            r#"
declare %rest:path("/inventory/{$warehouse}/feeds/{$feed}/items/{$item}/batches/{$batch=[0-9]+}")
  %rest:POST function inv:batch($warehouse, $feed, $item, $batch) { () };
declare %rest:path("/complex/{$a}/{$b}/{$c}/{$d}/{$e}/{$f}/{$g}/{$h}/{$i}")
  function inv:complex($a, $b, $c, $d, $e, $f, $g, $h, $i) { () };
declare %rest:error("inv:*") function inv:error($code) { () };
declare %perm:check("/inventory") function inv:guard() { () };
"#,
        ),
        (
            "chat.xqm",
            r#"
declare %ws:message("/chat/{$room}") function chat:message($room, $msg) { () };
"#,
        ),
    ]
}

fn bench_resolve_throughput(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (name, source) in example_modules() {
        std::fs::write(dir.path().join(name), source).expect("failed to write module");
    }
    let config = DispatchConfig {
        web_path: dir.path().to_path_buf(),
        parse_interval_ms: -1,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::new(&config).expect("failed to create dispatcher");

    let requests = [
        RequestView::new(Method::GET, "/zoo/animals"),
        RequestView::new(Method::GET, "/zoo/animals/123")
            .with_header("Accept", "text/xml, application/json;q=0.9"),
        RequestView::new(Method::GET, "/zoo/animals/123/toys/456"),
        RequestView::new(Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        RequestView::new(Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
        RequestView::new(Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
    ];

    c.bench_function("resolve", |b| {
        b.iter(|| {
            for req in requests.iter() {
                let res = dispatcher.resolve(req, None);
                black_box(&res);
            }
        })
    });

    c.bench_function("resolve_error", |b| {
        b.iter(|| black_box(dispatcher.resolve(&requests[4], Some("inv:FULL"))))
    });

    c.bench_function("checks", |b| {
        b.iter(|| black_box(dispatcher.checks(&requests[4])))
    });

    c.bench_function("websocket", |b| {
        b.iter(|| black_box(dispatcher.websocket("/chat/lobby", WsEvent::Message)))
    });
}

fn bench_rescan(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for i in 0..50 {
        let source = format!(
            "declare %rest:path(\"/m{i}/{{$id}}\") function local:m{i}($id) {{ () }};\n"
        );
        std::fs::write(dir.path().join(format!("m{i}.xqm")), source).expect("failed to write module");
    }
    let config = DispatchConfig {
        web_path: dir.path().to_path_buf(),
        parse_interval_ms: 0,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::new(&config).expect("failed to create dispatcher");

    // every snapshot request walks the tree but reuses unchanged modules
    c.bench_function("rescan_reuse_50_modules", |b| {
        b.iter(|| black_box(dispatcher.store().snapshot().map(|s| s.len())))
    });
}

criterion_group!(benches, bench_resolve_throughput, bench_rescan);
criterion_main!(benches);
