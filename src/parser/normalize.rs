//! Episode markup normalization
//!
//! Converts Kakuyomu episode HTML into an Aozora-bunko style plain-text
//! transcription. Ruby, emphasis dots and illustration links survive as
//! inline annotation markers; every other tag is dropped.
//!
//! The conversion is an ordered rule table. Order is significant: the ruby
//! and emphasis rules consume markup that the generic tag stripper would
//! otherwise eat, and the specific `emphasisDots` patterns must run before
//! the bare `<span>` patterns that share the same closing tags.

use regex::Regex;
use std::sync::LazyLock;

/// Ruby base start (`｜`)
pub const RUBY_START: &str = "｜";
/// Ruby reading start (`《`)
pub const RUBY_READING_START: &str = "《";
/// Ruby end (`》`)
pub const RUBY_END: &str = "》";
/// Emphasis dots start
pub const EMPHASIS_START: &str = "［＃丸傍点］";
/// Emphasis dots end
pub const EMPHASIS_END: &str = "［＃丸傍点終わり］";
/// Illustration link start, followed by the image URL
pub const IMAGE_START: &str = "［＃リンクの図（";
/// Illustration link end
pub const IMAGE_END: &str = "）入る］";

static BREAK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap());

static NUMERIC_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[0-9]+|[xX][0-9a-fA-F]+);").unwrap());

/// One step of the replacement table
enum Rule {
    /// Replace every occurrence of a literal
    Literal(&'static str, &'static str),
    /// Replace every match of a pattern
    Pattern(&'static LazyLock<Regex>, &'static str),
}

impl Rule {
    fn apply(&self, text: &str) -> String {
        match self {
            Rule::Literal(from, to) => text.replace(from, to),
            Rule::Pattern(re, to) => re.replace_all(text, *to).into_owned(),
        }
    }
}

/// Markup rules, in application order
static MARKUP_RULES: &[Rule] = &[
    // line breaks
    Rule::Pattern(&BREAK_REGEX, "\r\n"),
    // ruby
    Rule::Literal("<rp>(</rp>", ""),
    Rule::Literal("<rp>)</rp>", ""),
    Rule::Literal("<rp>（</rp>", ""),
    Rule::Literal("<rp>）</rp>", ""),
    Rule::Literal("<rb>", ""),
    Rule::Literal("</rb>", ""),
    Rule::Literal("<ruby>", RUBY_START),
    Rule::Literal("<rt>", RUBY_READING_START),
    Rule::Literal("</rt></ruby>", RUBY_END),
    // emphasis dots: class-qualified forms win over bare spans
    Rule::Literal(r#"<em class="emphasisDots"><span>"#, EMPHASIS_START),
    Rule::Literal("<span>", EMPHASIS_START),
    Rule::Literal("</span></em>", EMPHASIS_END),
    Rule::Literal("</span>", EMPHASIS_END),
    // illustration links; the closing quote of the href stays before the end marker
    Rule::Literal(r#"<a href=""#, IMAGE_START),
    Rule::Literal(r#" alt="挿絵" name="img">【挿絵表示】</a>"#, IMAGE_END),
    // everything else
    Rule::Pattern(&TAG_REGEX, ""),
    Rule::Literal(" ", ""),
];

/// Site-specific named entities. The site emits these without the trailing
/// semicolon; both spellings are accepted. `&quot` is deleted rather than
/// decoded. `&amp` must stay last.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&lt", "<"),
    ("&gt", ">"),
    ("&quot", ""),
    ("&nbsp", " "),
    ("&yen", "\\"),
    ("&brvbar", "|"),
    ("&copy", "©"),
    ("&amp", "&"),
];

/// Normalize an episode HTML fragment into annotated plain text
///
/// Total over every input, including the empty string.
///
/// # Examples
///
/// ```
/// use kakuhyo::parser::normalize::normalize;
///
/// let text = normalize("<p>foo<ruby>bar<rt>baz</rt></ruby>qux</p> quux");
/// assert_eq!(text, "foo｜bar《baz》quxquux");
/// ```
pub fn normalize(html: &str) -> String {
    let text = MARKUP_RULES
        .iter()
        .fold(html.to_string(), |acc, rule| rule.apply(&acc));

    decode_entities(&text)
}

/// Decode the named entity table followed by numeric character references
pub fn decode_entities(text: &str) -> String {
    let named = NAMED_ENTITIES.iter().fold(text.to_string(), |acc, (name, ch)| {
        acc.replace(&format!("{name};"), ch).replace(name, ch)
    });

    decode_numeric_refs(&named)
}

/// Decode `&#NNN;` / `&#xHH;` until no decodable reference remains
///
/// Every successful pass replaces a reference of at least four bytes with a
/// single character, so the loop ends once a pass changes nothing.
pub fn decode_numeric_refs(text: &str) -> String {
    let mut current = text.to_string();

    loop {
        if !NUMERIC_REF_REGEX.is_match(&current) {
            return current;
        }

        let next = NUMERIC_REF_REGEX
            .replace_all(&current, |caps: &regex::Captures| {
                let reference = &caps[0];
                html_escape::decode_html_entities(reference).into_owned()
            })
            .into_owned();

        if next == current {
            return current;
        }
        current = next;
    }
}
