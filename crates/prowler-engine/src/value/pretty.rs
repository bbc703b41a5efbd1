//! Rendering of value trees to single-line or multi-line text.

use std::fmt::Write;

use super::Value;
use crate::binary::types::Kind;

/// Strings longer than this flip slices, arrays and structs to the
/// indented multi-line form.
const MAX_SHORT_STRING_LEN: usize = 7;
const INDENT: &str = "\t";

const TOP: u8 = 1 << 0;
const NEWLINES: u8 = 1 << 1;
const INCLUDE_TYPE: u8 = 1 << 2;
const SHORTEN_TYPE: u8 = 1 << 3;

fn set(flags: u8, flag: u8, on: bool) -> u8 {
    if on {
        flags | flag
    } else {
        flags & !flag
    }
}

/// `name: value` line, the shape surfaced by `get`/`set` responses.
pub fn render(v: &Value) -> String {
    format!("{}: {}", v.name, multi_line(v, ""))
}

/// Representation of `v` on a single line.
pub fn single_line(v: &Value) -> String {
    let mut buf = String::new();
    write_to(v, &mut buf, TOP | INCLUDE_TYPE, "");
    buf
}

/// Single line with type names stripped of their leading path segments.
pub fn single_line_short_types(v: &Value) -> String {
    let mut buf = String::new();
    write_to(v, &mut buf, TOP | INCLUDE_TYPE | SHORTEN_TYPE, "");
    buf
}

/// Representation of `v` over multiple lines.
pub fn multi_line(v: &Value, indent: &str) -> String {
    let mut buf = String::new();
    write_to(v, &mut buf, TOP | NEWLINES | INCLUDE_TYPE, indent);
    buf
}

fn type_str(v: &Value, flags: u8) -> String {
    if flags & SHORTEN_TYPE != 0 {
        shorten_type(&v.type_name)
    } else {
        v.type_name.clone()
    }
}

/// Strips leading path segments: `github.com/x/pkg.T` becomes `pkg.T`.
pub fn shorten_type(ty: &str) -> String {
    match ty.rfind('/') {
        Some(i) => ty[i + 1..].to_owned(),
        None => ty.to_owned(),
    }
}

fn write_to(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    if let Some(ref reason) = v.unreadable {
        let _ = write!(buf, "(unreadable {reason})");
        return;
    }

    if flags & TOP == 0 && v.addr == 0 && v.value.is_empty() {
        if flags & INCLUDE_TYPE != 0 && v.type_name != "void" {
            let _ = write!(buf, "{} nil", type_str(v, flags));
        } else {
            buf.push_str("nil");
        }
        return;
    }

    match v.kind {
        Kind::Slice => write_slice(v, buf, flags, indent),
        Kind::Array => write_array(v, buf, flags, indent),
        Kind::Ptr => {
            if v.type_name.is_empty() || v.children.is_empty() {
                buf.push_str("nil");
            } else if v.children[0].only_addr && v.children[0].addr != 0 {
                write_pointer(v, buf, flags);
            } else {
                if flags & TOP != 0 && flags & NEWLINES != 0 && v.children[0].addr != 0 {
                    write_pointer(v, buf, flags);
                    buf.push('\n');
                }
                buf.push('*');
                write_to(&v.children[0], buf, set(flags, TOP, false), indent);
            }
        }
        Kind::UnsafePointer => {
            if v.children.is_empty() {
                buf.push_str("unsafe.Pointer(nil)");
            } else {
                let _ = write!(buf, "unsafe.Pointer({:#x})", v.children[0].addr);
            }
        }
        Kind::Chan => {
            if flags & NEWLINES != 0 {
                write_struct(v, buf, flags, indent);
            } else if v.children.is_empty() {
                let _ = write!(buf, "{} nil", type_str(v, flags));
            } else {
                let qcount = child_value(v, "qcount");
                let dataqsiz = child_value(v, "dataqsiz");
                let _ = write!(buf, "{} {}/{}", type_str(v, flags), qcount, dataqsiz);
            }
        }
        Kind::Struct => {
            let mut flags = flags;
            if !v.value.is_empty() {
                let _ = write!(buf, "{}({})", type_str(v, flags), v.value);
                flags = set(flags, INCLUDE_TYPE, false);
            }
            write_struct(v, buf, flags, indent);
        }
        Kind::Interface => write_interface(v, buf, flags, indent),
        Kind::Map => write_map(v, buf, flags, indent),
        Kind::Func => {
            if v.value.is_empty() {
                buf.push_str("nil");
            } else {
                buf.push_str(&v.value);
            }
        }
        _ => write_basic(v, buf),
    }
}

fn child_value<'a>(v: &'a Value, name: &str) -> &'a str {
    v.children
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.value.as_str())
        .unwrap_or("?")
}

fn write_interface(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    if v.addr == 0 {
        // An escaped interface out of scope; nothing sensible to show.
        buf.push_str("nil");
        return;
    }

    let Some(data) = v.children.first() else {
        buf.push_str("nil");
        return;
    };

    if flags & INCLUDE_TYPE != 0 {
        if data.kind == Kind::Invalid {
            let _ = write!(buf, "{} ", type_str(v, flags));
            if data.addr == 0 {
                buf.push_str("nil");
                return;
            }
        } else {
            let _ = write!(buf, "{}({}) ", type_str(v, flags), data.type_name);
        }
    }

    if data.kind == Kind::Ptr {
        if data.children.is_empty() {
            buf.push_str("...");
        } else if data.children[0].addr == 0 {
            buf.push_str("nil");
        } else if data.children[0].only_addr {
            let _ = write!(buf, "0x{:x}", data.addr);
        } else {
            write_to(
                data,
                buf,
                set(
                    set(flags, TOP, false),
                    INCLUDE_TYPE,
                    flags & INCLUDE_TYPE == 0,
                ),
                indent,
            );
        }
    } else if data.only_addr {
        let _ = write!(buf, "*(*{})({:#x})", type_str(v, flags), v.addr);
    } else {
        write_to(
            data,
            buf,
            set(
                set(flags, TOP, false),
                INCLUDE_TYPE,
                flags & INCLUDE_TYPE == 0,
            ),
            indent,
        );
    }
}

fn write_map(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    if flags & INCLUDE_TYPE != 0 {
        let _ = write!(buf, "{} ", type_str(v, flags));
    }
    if v.base == 0 && v.children.is_empty() {
        buf.push_str("nil");
        return;
    }

    let nl = flags & NEWLINES != 0 && !v.children.is_empty();
    buf.push('[');

    let mut i = 0;
    while i + 1 < v.children.len() {
        let key = &v.children[i];
        let value = &v.children[i + 1];

        if nl {
            let _ = write!(buf, "\n{indent}{INDENT}");
        }

        write_to(key, buf, 0, &format!("{indent}{INDENT}"));
        buf.push_str(": ");
        write_to(value, buf, set(0, NEWLINES, nl), &format!("{indent}{INDENT}"));

        if i + 2 < v.children.len() || nl {
            buf.push_str(", ");
        }
        i += 2;
    }

    if (v.children.len() / 2) as i64 != v.len {
        if !v.children.is_empty() {
            if nl {
                let _ = write!(buf, "\n{indent}{INDENT}");
            } else {
                buf.push(',');
            }
            let _ = write!(buf, "...+{} more", v.len - (v.children.len() / 2) as i64);
        } else {
            buf.push_str("...");
        }
    }

    if nl {
        let _ = write!(buf, "\n{indent}");
    }
    buf.push(']');
}

fn write_slice(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    if flags & INCLUDE_TYPE != 0 {
        let _ = write!(
            buf,
            "{} len: {}, cap: {}, ",
            type_str(v, flags),
            v.len,
            v.cap
        );
    }
    if v.base == 0 && v.children.is_empty() {
        buf.push_str("nil");
        return;
    }
    write_slice_or_array(v, buf, flags, indent);
}

fn write_array(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    if flags & INCLUDE_TYPE != 0 {
        let _ = write!(buf, "{} ", type_str(v, flags));
    }
    write_slice_or_array(v, buf, flags, indent);
}

fn write_slice_or_array(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    let nl = should_newline_array(v, flags & NEWLINES != 0);
    buf.push('[');

    for (i, child) in v.children.iter().enumerate() {
        if nl {
            let _ = write!(buf, "\n{indent}{INDENT}");
        }
        write_to(child, buf, set(0, NEWLINES, nl), &format!("{indent}{INDENT}"));
        if i != v.children.len() - 1 || nl {
            buf.push(',');
        }
    }

    if v.children.len() as i64 != v.len {
        if !v.children.is_empty() {
            if nl {
                let _ = write!(buf, "\n{indent}{INDENT}");
            } else {
                buf.push(',');
            }
            let _ = write!(buf, "...+{} more", v.len - v.children.len() as i64);
        } else {
            buf.push_str("...");
        }
    }

    if nl {
        let _ = write!(buf, "\n{indent}");
    }
    buf.push(']');
}

/// Kind at the bottom of a pointer chain, plus whether the chain crossed a
/// pointer at all.
fn recursive_kind(v: &Value) -> (Kind, bool) {
    let mut v = v;
    let mut has_ptr = false;
    loop {
        if v.kind == Kind::Ptr {
            has_ptr = true;
            match v.children.first() {
                Some(child) => v = child,
                None => return (v.kind, has_ptr),
            }
        } else {
            return (v.kind, has_ptr);
        }
    }
}

fn should_newline_array(v: &Value, newlines: bool) -> bool {
    if !newlines || v.children.is_empty() {
        return false;
    }

    let (kind, has_ptr) = recursive_kind(&v.children[0]);
    match kind {
        Kind::Slice | Kind::Array | Kind::Struct | Kind::Map | Kind::Interface => true,
        Kind::String => {
            has_ptr
                || v.children
                    .iter()
                    .any(|c| c.value.len() > MAX_SHORT_STRING_LEN)
        }
        _ => false,
    }
}

fn should_newline_struct(v: &Value, newlines: bool) -> bool {
    if !newlines || v.children.is_empty() {
        return false;
    }

    for child in &v.children {
        let (kind, has_ptr) = recursive_kind(child);
        match kind {
            Kind::Slice | Kind::Array | Kind::Struct | Kind::Map | Kind::Interface => return true,
            Kind::String => {
                if has_ptr || child.value.len() > MAX_SHORT_STRING_LEN {
                    return true;
                }
            }
            _ => (),
        }
    }

    false
}

fn write_struct(v: &Value, buf: &mut String, flags: u8, indent: &str) {
    if v.len != v.children.len() as i64 && v.children.is_empty() {
        // Fields were cut off by the recursion cap.
        if v.type_name.contains('/') {
            let _ = write!(buf, "(*{:?})({:#x})", type_str(v, flags), v.addr);
        } else {
            let _ = write!(buf, "(*{})({:#x})", type_str(v, flags), v.addr);
        }
        return;
    }

    if flags & INCLUDE_TYPE != 0 {
        let _ = write!(buf, "{} ", type_str(v, flags));
    }

    let nl = should_newline_struct(v, flags & NEWLINES != 0);
    buf.push('{');

    for (i, child) in v.children.iter().enumerate() {
        if nl {
            let _ = write!(buf, "\n{indent}{INDENT}");
        }
        let _ = write!(buf, "{}: ", child.name);
        write_to(
            child,
            buf,
            set(INCLUDE_TYPE, NEWLINES, nl),
            &format!("{indent}{INDENT}"),
        );
        if i != v.children.len() - 1 || nl {
            buf.push(',');
            if !nl {
                buf.push(' ');
            }
        }
    }

    if v.children.len() as i64 != v.len {
        if nl {
            let _ = write!(buf, "\n{indent}{INDENT}");
        } else {
            buf.push(',');
        }
        let _ = write!(buf, "...+{} more", v.len - v.children.len() as i64);
    }

    buf.push('}');
}

fn write_pointer(v: &Value, buf: &mut String, flags: u8) {
    if v.type_name.contains('/') {
        let _ = write!(buf, "({:?})({:#x})", type_str(v, flags), v.children[0].addr);
    } else {
        let _ = write!(buf, "({})({:#x})", type_str(v, flags), v.children[0].addr);
    }
}

fn write_basic(v: &Value, buf: &mut String) {
    if v.value.is_empty() && v.kind != Kind::String {
        let _ = write!(buf, "(unknown {})", v.kind);
        return;
    }

    match v.kind {
        Kind::String => {
            let mut s = v.value.clone();
            if s.len() as i64 != v.len {
                s = format!("{s}...+{} more", v.len - s.len() as i64);
            }
            let _ = write!(buf, "{s:?}");
        }
        _ => buf.push_str(&v.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::types::TypeId;

    fn leaf(kind: Kind, type_name: &str, value: &str) -> Value {
        Value {
            name: String::new(),
            addr: 0x1000,
            only_addr: false,
            ty: TypeId(0),
            real_ty: TypeId(0),
            kind,
            type_name: type_name.to_owned(),
            value: value.to_owned(),
            len: 0,
            cap: 0,
            base: 0,
            children: Vec::new(),
            flags: 0,
            unreadable: None,
        }
    }

    #[test]
    fn scalar_rendering() {
        let mut v = leaf(Kind::Int, "int", "42");
        v.name = "pkg.N".to_owned();
        assert_eq!(render(&v), "pkg.N: 42");
        assert_eq!(single_line(&v), "42");
    }

    #[test]
    fn strings_are_quoted_and_truncated() {
        let mut v = leaf(Kind::String, "string", "hello");
        v.len = 5;
        assert_eq!(single_line(&v), "\"hello\"");

        v.len = 12; // seven bytes were cut off by the load cap
        assert_eq!(single_line(&v), "\"hello...+7 more\"");
    }

    #[test]
    fn slice_truncation_marker() {
        let mut v = leaf(Kind::Slice, "[]int", "");
        v.len = 70;
        v.cap = 70;
        v.base = 0x2000;
        for i in 0..64 {
            v.children.push(leaf(Kind::Int, "int", &i.to_string()));
        }

        let out = single_line(&v);
        assert!(out.starts_with("[]int len: 70, cap: 70, ["));
        assert!(out.ends_with(",...+6 more]"), "got: {out}");
        assert!(!out.contains("64,"));
    }

    #[test]
    fn nil_slice_renders_nil() {
        let v = leaf(Kind::Slice, "[]int", "");
        assert_eq!(single_line(&v), "[]int len: 0, cap: 0, nil");
    }

    #[test]
    fn struct_fields_in_declaration_order() {
        let mut v = leaf(Kind::Struct, "main.Conf", "");
        let mut host = leaf(Kind::String, "string", "a");
        host.name = "Host".to_owned();
        host.len = 1;
        let mut port = leaf(Kind::Int, "int", "81");
        port.name = "Port".to_owned();
        v.children = vec![host, port];
        v.len = 2;

        assert_eq!(single_line(&v), "main.Conf {Host: \"a\", Port: 81}");
    }

    #[test]
    fn struct_beyond_recursion_cap_prints_address() {
        let mut v = leaf(Kind::Struct, "main.Node", "");
        v.len = 2; // two fields, none loaded
        assert_eq!(single_line(&v), "(*main.Node)(0x1000)");
    }

    #[test]
    fn nil_pointer_renders_nil() {
        let mut v = leaf(Kind::Ptr, "*int", "");
        let mut child = leaf(Kind::Int, "int", "");
        child.addr = 0;
        v.children.push(child);
        assert_eq!(single_line(&v), "*int nil");

        let bare = leaf(Kind::Ptr, "*int", "");
        assert_eq!(single_line(&bare), "nil");
    }

    #[test]
    fn pointer_at_recursion_cap_prints_address() {
        let mut v = leaf(Kind::Ptr, "*main.Node", "");
        let mut child = leaf(Kind::Struct, "main.Node", "");
        child.addr = 0x3000;
        child.only_addr = true;
        v.children.push(child);
        assert_eq!(single_line(&v), "(*main.Node)(0x3000)");
    }

    #[test]
    fn multiline_struct_with_long_string() {
        let mut v = leaf(Kind::Struct, "main.Conf", "");
        v.name = "main.Conf".to_owned();
        let mut host = leaf(Kind::String, "string", "very-long-host");
        host.name = "Host".to_owned();
        host.len = 14;
        v.children = vec![host];
        v.len = 1;

        let out = multi_line(&v, "");
        assert_eq!(out, "main.Conf {\n\tHost: \"very-long-host\",}");
    }

    #[test]
    fn unreadable_subtree_is_annotated() {
        let mut v = leaf(Kind::Int, "int", "");
        v.unreadable = Some("short read at 0x10: 0 of 8 bytes".to_owned());
        assert_eq!(
            single_line(&v),
            "(unreadable short read at 0x10: 0 of 8 bytes)"
        );
    }

    #[test]
    fn map_renders_pairs() {
        let mut v = leaf(Kind::Map, "map[string]int", "");
        v.base = 0x4000;
        v.len = 1;
        let mut k = leaf(Kind::String, "string", "one");
        k.len = 3;
        let val = leaf(Kind::Int, "int", "1");
        v.children = vec![k, val];

        assert_eq!(single_line(&v), "map[string]int [\"one\": 1]");
    }

    #[test]
    fn type_shortening_strips_path() {
        assert_eq!(shorten_type("github.com/x/pkg.Type"), "pkg.Type");
        assert_eq!(shorten_type("main.Conf"), "main.Conf");
    }
}
