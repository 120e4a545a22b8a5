use nom::{
    character::complete::{char, digit1, multispace0, none_of},
    Finish,
    IResult,
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    branch::alt,
    bytes::complete::{escaped_transform, take_while},
};
use bencodec::*;
use anyhow::{anyhow, Result};
use base64::decode;
use std::borrow::Cow;

const B64_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

fn ws<'a, O, F>(f: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, f, multispace0)
}

fn int(i: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |n: &str| n.parse())(i)
}

fn b64(i: &str) -> IResult<&str, Vec<u8>> {
    map_res(delimited(char('\''), take_while(move |c| B64_CHARS.contains(c)), char('\'')), decode)(i)
}

fn string(i: &str) -> IResult<&str, String> {
    delimited(
            char('"'),
            map(opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((
                        value("\\", char('\\')),
                        value("\"", char('"')),
                        value("\n", char('n')),
                )))), |c| c.unwrap_or_default()),
            char('"')
    )(i)
}

fn bytes(i: &str) -> IResult<&str, Vec<u8>> {
    alt((map(string, String::into_bytes), b64))(i)
}

fn list(i: &str) -> IResult<&str, Vec<Value<'static>>> {
    delimited(
        ws(char('[')),
        terminated(separated_list0(char(','), ws(bvalue)), opt(ws(char(',')))),
        char(']'),
    )(i)
}

fn dict(i: &str) -> IResult<&str, Dictionary<'static>> {
    map(
        delimited(
            ws(char('{')),
            terminated(
                separated_list0(char(','), ws(separated_pair(bytes, ws(char(':')), bvalue))),
                opt(ws(char(','))),
            ),
            char('}'),
        ),
        |entries| entries.into_iter().map(|(k, v)| (Cow::Owned(k), v)).collect(),
    )(i)
}

fn bvalue(i: &str) -> IResult<&str, Value<'static>> {
    alt((
        map(int, Value::Int),
        map(bytes, |b| Value::Bytes(Cow::Owned(b))),
        map(list, Value::List),
        map(dict, Value::Dict),
    ))(i)
}

pub fn parse(i: &str) -> Result<Value<'static>> {
    Ok(all_consuming(preceded(multispace0, terminated(bvalue, multispace0)))(i).finish().map_err(|e| anyhow!("{}", e))?.1)
}

#[cfg(test)]
mod test {
    use super::parse;
    use bencodec::*;

    #[test]
    fn scalars() {
        assert_eq!(parse("42").unwrap(), Value::Int(42));
        assert_eq!(parse(" -7\n").unwrap(), Value::Int(-7));
        assert_eq!(parse(r#""say \"moo\"\\\n""#).unwrap(), Value::from("say \"moo\"\\\n"));
        assert_eq!(parse(r#""""#).unwrap(), Value::from(""));
        assert_eq!(parse("'//4='").unwrap(), Value::from(vec![0xffu8, 0xfe]));
        assert!(parse("99999999999999999999").is_err());
        assert!(parse("true").is_err());
    }

    #[test]
    fn containers() {
        assert_eq!(parse("[]").unwrap(), Value::List(vec![]));
        assert_eq!(parse("{ }").unwrap(), Value::Dict(Dictionary::new()));
        assert_eq!(parse("[1, 2,]").unwrap(), Value::List(vec![Value::Int(1), Value::Int(2)]));
        let value = parse("{ \"b\": [\"x\"], 'YQ==': {}, }").unwrap();
        assert_eq!(Encoder::from_value(&value).as_bytes(), b"d1:bl1:xe1:adee");
        assert!(parse("[1 2]").is_err());
        assert!(parse("{1: 2}").is_err());
    }

    #[test]
    fn display_parses_back() {
        let input = b"d4:infod6:lengthi1e6:piecesl2:\xff\xfe0:ee4:spaml3:a\"b1:\\1:\nee3:nil0:e";
        let (value, _) = Decoder::decode(&input[..]).unwrap();
        assert_eq!(parse(&value.to_string()).unwrap(), value);
    }
}
