use std::{env, error::Error, io, process::ExitCode};

use tracing::Level;
use twopass6502::{AsmConfig, Assembler, disassemble};

// Demo program: a mix of operand shapes and all three directives
// (not necessarily meaningful at runtime)
const DEMO: &str = r#"
; static noise into a screen page
        DEFINE screen $0500
        DEFINE seed   $FE
        DEFINE ptr    $10

        *=$0600
start:  LDY #$FF
        LDX #0
loop:   LDA seed        ; random byte
        STA screen,X
        AND #$0F
        STA (ptr),Y
        LDA (ptr,X)
        ASL
        ROR A
        INX
        DEY
        BNE loop
        JSR done
        JMP (vector)
done:   RTS

vector: DCB <start, >start
"#;

fn main() -> ExitCode {
    let level = if env::args().any(|a| a == "-v" || a == "--verbose") {
        Level::TRACE
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = main_real() {
        tracing::error!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_real() -> Result<(), Box<dyn Error>> {
    let config = AsmConfig { base_address: 0x0600, capacity: 0x0200 };
    let mut assembler = Assembler::with_config(config);
    let bytes = assembler.assemble(DEMO)?;

    assembler.print_listing()?;
    println!();

    for chunk in bytes.chunks(16) {
        let hex: Vec<_> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        println!("{}", hex.join(" "));
    }
    println!();

    print!("{}", disassemble(&bytes, config.base_address));
    tracing::info!("{} bytes, {} symbols", bytes.len(), assembler.symbols().len());
    Ok(())
}
