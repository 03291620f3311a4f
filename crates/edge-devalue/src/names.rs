//! Short names for values referenced more than once.

const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$";

const RESERVED: &[&str] = &[
    "do", "if", "in", "for", "int", "let", "new", "try", "var", "byte", "case", "char", "else",
    "enum", "goto", "long", "this", "void", "with", "await", "break", "catch", "class", "const",
    "final", "float", "short", "super", "throw", "while", "yield", "delete", "double", "export",
    "import", "native", "return", "switch", "throws", "typeof", "boolean", "default", "extends",
    "finally", "package", "private", "abstract", "continue", "debugger", "function", "volatile",
    "interface", "protected", "transient", "implements", "instanceof", "synchronized",
];

/// Name for the `index`-th shared value: `a`..`$`, then `aa`, `ab`, ...
///
/// Names that collide with reserved words get a `0` suffix.
pub(crate) fn get_name(index: usize) -> String {
    let base = CHARS.len() as i64;
    let mut num = index as i64;
    let mut name = Vec::new();
    loop {
        name.push(CHARS[(num % base) as usize]);
        num = num / base - 1;
        if num < 0 {
            break;
        }
    }
    name.reverse();
    let name = String::from_utf8_lossy(&name).into_owned();

    if RESERVED.contains(&name.as_str()) {
        format!("{}0", name)
    } else {
        name
    }
}
