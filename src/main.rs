use std::process::ExitCode;

fn main() -> ExitCode {
    match attendance_consolidator_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
