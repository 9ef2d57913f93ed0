/// Print a standardized warning line to stderr (color-aware).
pub fn warn_print(msg: &str) {
    let use_err = crate::color_enabled_stderr();
    eprintln!("{}", warning_line(use_err, msg));
}

fn warning_line(use_color: bool, msg: &str) -> String {
    crate::paint(use_color, "\x1b[33;1m", &format!("warning: {msg}"))
}
