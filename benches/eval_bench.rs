use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lazyscheme::{Evaluator, parse_program, tokenize};
use std::hint::black_box;

const FIB_SOURCE: &str = r#"
(define (fib n)
  ; operands are passed unevaluated and forced on every use
  (if (< n 2)
      n
      (+ (fib (- n 1))
         (fib (- n 2)))))
"#;

const LAZY_SOURCE: &str = r#"
(define (loop) (loop))
(define (ones) (cons 1 (lambda () (ones))))
(define (take n s)
  (if (= n 0) '() (cons (car s) (take (- n 1) ((cdr s))))))
(define (pick a b c) b)
(pick (loop) (take 20 (ones)) (/ 1 0))
"#;

fn lexer_benchmark(c: &mut Criterion) {
    let input = FIB_SOURCE.repeat(20);
    c.bench_function("tokenize fib x20", |b| {
        b.iter(|| tokenize(black_box(&input)))
    });
}

fn fib_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("fib");
    for n in [10, 15] {
        let source = format!("{} (fib {})", FIB_SOURCE, n);
        let program = match parse_program(&source) {
            Ok(program) => program,
            Err(e) => panic!("bench program does not parse: {}", e),
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &program, |b, program| {
            b.iter(|| Evaluator::new(std::io::sink()).eval_program(black_box(program)))
        });
    }
    group.finish();
}

fn lazy_benchmark(c: &mut Criterion) {
    let program = match parse_program(LAZY_SOURCE) {
        Ok(program) => program,
        Err(e) => panic!("bench program does not parse: {}", e),
    };
    c.bench_function("take 20 of an infinite stream", |b| {
        b.iter(|| Evaluator::new(std::io::sink()).eval_program(black_box(&program)))
    });
}

criterion_group!(benches, lexer_benchmark, fib_benchmark, lazy_benchmark);
criterion_main!(benches);
