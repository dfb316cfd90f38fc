use std::process::ExitCode;

fn main() -> ExitCode {
    match coco_doctor::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
