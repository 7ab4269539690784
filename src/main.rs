#![allow(non_snake_case)]
use RustedCAS::Examples::nonlinear_eqs_examples::nonlinear_examples;
use RustedCAS::Examples::symbolic_examples::sym_examples;
use RustedCAS::Utils::logger::init_logger;

fn main() {
    let example = 4;
    if let Err(e) = init_logger(Some("info")) {
        eprintln!("logger: {}", e);
    }
    let result = match example {
        0..=5 => sym_examples(example),
        // NONLINEAR EQUATIONS
        6..=8 => nonlinear_examples(example - 6),
        _ => {
            println!("examples 0-5 are symbolic, 6-8 nonlinear");
            Ok(())
        }
    };
    if let Err(e) = result {
        eprintln!("example {} failed: {}", example, e);
    }
}
