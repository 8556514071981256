//! Encoder for the tag-delimited wire format.

use crate::value::{WireObject, WireValue};

/// Render a value as its wire form.
///
/// The output carries no whitespace between elements, so concatenating
/// encoded values produces a valid stream.
pub fn encode_value(value: &WireValue) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &WireValue, out: &mut String) {
    match value {
        WireValue::Str(s) => {
            out.push_str("<str>");
            write_escaped(s, out);
            out.push_str("</str>");
        }
        WireValue::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        WireValue::Float(f) => {
            out.push_str("<float>");
            out.push_str(&f.to_string());
            out.push_str("</float>");
        }
        WireValue::Bool(b) => {
            out.push_str("<boolean>");
            out.push_str(if *b { "True" } else { "False" });
            out.push_str("</boolean>");
        }
        WireValue::None => out.push_str("<none/>"),
        WireValue::List(items) => write_seq("list", items, out),
        WireValue::Tuple(items) => write_seq("tuple", items, out),
        WireValue::Dict(pairs) => {
            out.push_str("<dict>");
            for (key, value) in pairs {
                out.push_str("<pair><key>");
                write_value(key, out);
                out.push_str("</key><value>");
                write_value(value, out);
                out.push_str("</value></pair>");
            }
            out.push_str("</dict>");
        }
        WireValue::Object(obj) => write_object(obj, out),
    }
}

fn write_seq(tag: &str, items: &[WireValue], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    for item in items {
        write_value(item, out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_object(obj: &WireObject, out: &mut String) {
    out.push_str("<XMLObject class=\"");
    out.push_str(&obj.class);
    out.push_str("\">");
    for (name, value) in &obj.fields {
        out.push('<');
        out.push_str(name);
        out.push('>');
        write_value(value, out);
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
    out.push_str("</XMLObject>");
}

/// `&`, `<` and `>` are the only bytes with structural meaning in text.
fn write_escaped(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(encode_value(&WireValue::Str("hi".into())), "<str>hi</str>");
        assert_eq!(encode_value(&WireValue::Int(-7)), "<int>-7</int>");
        assert_eq!(
            encode_value(&WireValue::Bool(true)),
            "<boolean>True</boolean>"
        );
        assert_eq!(
            encode_value(&WireValue::Bool(false)),
            "<boolean>False</boolean>"
        );
        assert_eq!(encode_value(&WireValue::None), "<none/>");
    }

    #[test]
    fn string_escaping() {
        assert_eq!(
            encode_value(&WireValue::Str("a<b & b>c".into())),
            "<str>a&lt;b &amp; b&gt;c</str>"
        );
    }

    #[test]
    fn nested_list() {
        let v = WireValue::List(vec![
            WireValue::Int(1),
            WireValue::Tuple(vec![WireValue::Str("x".into()), WireValue::None]),
        ]);
        assert_eq!(
            encode_value(&v),
            "<list><int>1</int><tuple><str>x</str><none/></tuple></list>"
        );
    }

    #[test]
    fn dict_pairs_in_order() {
        let v = WireValue::Dict(vec![
            (WireValue::Str("k".into()), WireValue::Int(1)),
            (WireValue::Int(2), WireValue::Bool(false)),
        ]);
        assert_eq!(
            encode_value(&v),
            "<dict><pair><key><str>k</str></key><value><int>1</int></value></pair>\
             <pair><key><int>2</int></key><value><boolean>False</boolean></value></pair></dict>"
        );
    }

    #[test]
    fn object_with_fields() {
        let obj = WireObject::new("cadre.AgentIdentity")
            .field("name", WireValue::Str("director".into()))
            .field("port", WireValue::Int(9000));
        assert_eq!(
            encode_value(&WireValue::Object(obj)),
            "<XMLObject class=\"cadre.AgentIdentity\">\
             <name><str>director</str></name>\
             <port><int>9000</int></port>\
             </XMLObject>"
        );
    }
}
