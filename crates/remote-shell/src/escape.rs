//! POSIX shell quoting for command arguments.
//!
//! Every argument is wrapped in single quotes, which makes spaces, `$`,
//! backticks, `;`, `|`, `&`, double quotes and newlines inert. Embedded single
//! quotes are closed, backslash-escaped and reopened: `'` becomes `'\''`.

/// Quote one argument so a POSIX shell reads it back as exactly one word.
///
/// Correct for any string without a NUL byte. Not idempotent: quoting an
/// already quoted string quotes it again.
///
/// # Example
///
/// ```
/// use remote_shell::escape_arg;
///
/// assert_eq!(escape_arg("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn escape_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            quoted.push_str(r"'\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Build a command line from a base command and optional arguments.
///
/// With `None` the base command is returned unchanged. Otherwise one space
/// follows the base command, then the quoted arguments joined by single
/// spaces, so an empty list leaves a trailing space.
///
/// # Example
///
/// ```
/// use remote_shell::build_command;
///
/// assert_eq!(build_command("ls", None::<&[&str]>), "ls");
/// assert_eq!(build_command("ls", Some(Vec::<String>::new())), "ls ");
/// assert_eq!(build_command("ls", Some(&["a b"])), "ls 'a b'");
/// ```
#[must_use]
pub fn build_command<I>(command: &str, args: Option<I>) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let Some(args) = args else {
        return command.to_string();
    };

    let escaped: Vec<String> = args
        .into_iter()
        .map(|a| escape_arg(a.as_ref()))
        .collect();
    format!("{command} {}", escaped.join(" "))
}
