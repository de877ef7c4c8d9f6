use logos::Logos;

/// Tokens between tags
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub(crate) enum ContentToken<'src> {
    #[regex(r"<\?([^?]|\?[^>])*\?>")]
    Prolog,

    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    #[token("</")]
    CloseOpen,

    #[token("<")]
    Open,

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside a tag
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub(crate) enum MarkupToken<'src> {
    #[regex(r"[A-Za-z_:][A-Za-z0-9_:.\-]*", |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| trim_quotes(lex.slice()))]
    #[regex(r"'[^']*'", |lex| trim_quotes(lex.slice()))]
    Quoted(&'src str),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,
}

fn trim_quotes(slice: &str) -> &str {
    &slice[1..slice.len() - 1]
}
