use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smscr::context::BufferContext;
use smscr::script::{parse, reconstruct, Engine};

fn make_page(rows: usize) -> String {
    let row = "<tr><td>{$= i $}</td><td>{$= i i * \"0.00\" @decfmt $}</td></tr>\n";
    format!(
        "<table>\n{{$FOR i 1 {rows} $}}{row}{{$END$}}</table>\n\
         {{$= \"text/html\" @setMimeType \"n\" 0 @paramGet 1 + $}}\n"
    )
}

fn bench_render(c: &mut Criterion) {
    let small = make_page(10);
    let large = make_page(1000);
    let small_doc = parse(&small).unwrap();
    let large_doc = parse(&large).unwrap();

    let mut g = c.benchmark_group("smartscript");

    g.bench_function("parse_small", |b| b.iter(|| parse(black_box(&small)).unwrap()));
    g.bench_function("reconstruct_small", |b| {
        b.iter(|| reconstruct(black_box(&small_doc)))
    });

    g.bench_function("execute_small", |b| {
        b.iter(|| {
            let mut ctx = BufferContext::new();
            Engine::new(black_box(&small_doc), &mut ctx).execute().unwrap();
            ctx.output
        })
    });
    g.bench_function("execute_large", |b| {
        b.iter(|| {
            let mut ctx = BufferContext::new();
            Engine::new(black_box(&large_doc), &mut ctx).execute().unwrap();
            ctx.output
        })
    });

    g.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
