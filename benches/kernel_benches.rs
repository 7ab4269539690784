use RustedCAS::symbolic::evaluate::evaluate_at;
use RustedCAS::symbolic::namespace::Namespace;
use RustedCAS::symbolic::real::Real;
use RustedCAS::symbolic::symbolic_engine::Expr;
use RustedCAS::symbolic::symbolic_engine_derivatives::differentiate;
use RustedCAS::symbolic::symbolic_lambdify::{Library, compile};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// d/dx of Exp[x*y]*Sin[x] + x^3/(y^2 + 1)
fn test_function(ns: &Namespace) -> (Expr, Vec<Expr>) {
    let vars = Expr::symbols("x, y");
    let (x, y) = (vars[0].clone(), vars[1].clone());
    let exp = ns.call("Exp", vec![x.clone() * y.clone()]).unwrap();
    let sin = ns.call("Sin", vec![x.clone()]).unwrap();
    let f = exp * sin + x.pow(3) / (y.pow(2) + 1);
    let df = differentiate(&f, &x, ns).unwrap();
    (df, vars)
}

fn bench_compiled_vs_evaluated(c: &mut Criterion) {
    let ns = Namespace::standard();
    let (df, vars) = test_function(&ns);
    let compiled = compile(&df, &vars, &[Library::standard()]).unwrap();
    let mut group = c.benchmark_group("derivative at a point");
    group.bench_function("compiled", |b| {
        b.iter(|| compiled.eval(black_box(&[0.3, 1.7])))
    });
    let at = [
        Expr::arrow(vars[0].clone(), Expr::constant(Real::from_f64(0.3).unwrap())),
        Expr::arrow(vars[1].clone(), Expr::constant(Real::from_f64(1.7).unwrap())),
    ];
    group.bench_function("evaluated", |b| {
        b.iter(|| evaluate_at(black_box(&df), &at, &ns))
    });
    group.finish();
}

fn bench_differentiate(c: &mut Criterion) {
    let ns = Namespace::standard();
    c.bench_function("differentiate and compile", |b| {
        b.iter(|| {
            let (df, vars) = test_function(&ns);
            compile(&df, &vars, &[Library::standard()]).unwrap()
        })
    });
}

criterion_group!(benches, bench_compiled_vs_evaluated, bench_differentiate);
criterion_main!(benches);
