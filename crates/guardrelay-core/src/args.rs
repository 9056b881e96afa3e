//! SteamCMD argument list handling.
//!
//! The list the operator passes is normalized once (every `+quit` removed)
//! and then threaded through the loop by value: each fetched code produces a
//! new list via [`apply_guard_code`], and [`invocation_args`] appends the
//! single trailing `+quit` right before each run.

/// Makes SteamCMD exit once it has run the preceding commands.
pub const QUIT_FLAG: &str = "+quit";

/// Passes a Steam Guard code to SteamCMD; the code is the next argument.
pub const GUARD_CODE_FLAG: &str = "+set_steam_guard_code";

/// Drop every `+quit` so exactly one can be appended at the end later.
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter()
        .map(Into::into)
        .filter(|arg| arg != QUIT_FLAG)
        .collect()
}

/// The list actually handed to SteamCMD: `args` followed by `+quit`.
pub fn invocation_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len() + 1);
    out.extend(args.iter().filter(|arg| *arg != QUIT_FLAG).cloned());
    out.push(QUIT_FLAG.to_string());
    out
}

/// Return `args` with `code` set as the Steam Guard code.
///
/// Without the flag, `[GUARD_CODE_FLAG, code]` is appended. With it, the
/// value after the last occurrence is replaced in place (or supplied, if
/// the flag is the final argument). Applying the same code twice yields the
/// same list as applying it once.
pub fn apply_guard_code(args: &[String], code: &str) -> Vec<String> {
    let mut out = args.to_vec();
    match out.iter().rposition(|arg| arg == GUARD_CODE_FLAG) {
        Some(pos) if pos + 1 < out.len() => out[pos + 1] = code.to_string(),
        Some(_) => out.push(code.to_string()),
        None => {
            out.push(GUARD_CODE_FLAG.to_string());
            out.push(code.to_string());
        }
    }
    out
}
