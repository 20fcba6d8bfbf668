use color_eyre::Result;

/// Run the interpreter.
fn main() -> Result<()> {
    loxe_lib::run_interpreter::<loxe_tw::TwInterpreter>()
}
