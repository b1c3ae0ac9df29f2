use std::io::{self, BufRead, Write};
use std::str;
use std::sync::Arc;

use failure::Error;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

use crate::lottery::errors::ImportError;
use crate::lottery::types::Ticket;
use crate::lottery::Lottery;

/// Element and attribute names of the save file. They are part of the file
/// format and must not change.
pub mod tags {
    pub const ROOT: &str = "VeletPearLottery";
    pub const MAX_LOTTERY_NUMBER: &str = "MaxLotteryNumber";
    pub const TICKETS: &str = "Tickets";
    pub const TICKETS_PRICE: &str = "Price";
    pub const TICKET: &str = "Ticket";
    pub const TICKET_LOTTERY_NUMBER: &str = "LotteryNumber";
    pub const TICKET_OWNER: &str = "Owner";
    pub const TICKET_COMMENT: &str = "Comment";
    pub const WINNERS: &str = "Winners";
    pub const WINNER: &str = "Winner";
    pub const WINNER_LOTTERY_NUMBER: &str = "LotteryNumber";
}

impl Lottery {
    pub fn export_to<W: Write>(&self, out: W) -> Result<(), Error> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new(tags::ROOT)))?;

        write_value(
            &mut writer,
            tags::MAX_LOTTERY_NUMBER,
            &self.ceiling().to_string(),
        )?;

        let price = self.ticket_price().to_string();
        let mut tickets = BytesStart::new(tags::TICKETS);
        tickets.push_attribute((tags::TICKETS_PRICE, price.as_str()));
        if self.tickets().is_empty() {
            writer.write_event(Event::Empty(tickets))?;
        } else {
            writer.write_event(Event::Start(tickets))?;
            for ticket in self.tickets() {
                write_ticket(&mut writer, ticket)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tags::TICKETS)))?;
        }

        if !self.winners().is_empty() {
            writer.write_event(Event::Start(BytesStart::new(tags::WINNERS)))?;
            for winner in self.winners() {
                let number = winner.to_string();
                let mut entry = BytesStart::new(tags::WINNER);
                entry.push_attribute((tags::WINNER_LOTTERY_NUMBER, number.as_str()));
                writer.write_event(Event::Empty(entry))?;
            }
            writer.write_event(Event::End(BytesEnd::new(tags::WINNERS)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(tags::ROOT)))?;
        writer.into_inner().flush()?;
        Ok(())
    }

    /// Reads a lottery written by `export_to`. The session is rebuilt through
    /// `Lottery::from_existing`, so nothing in the file is trusted verbatim.
    pub fn import_from<R: BufRead>(input: R) -> Result<Lottery, ImportError> {
        let result = parse_document(input)
            .and_then(|root| root.ok_or(ImportError::InvalidFile))
            .and_then(|root| read_lottery(&root));
        if let Err(ref err) = result {
            warn!(error = %err, "rejected lottery file");
        }
        result
    }
}

fn write_value<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_ticket<W: Write>(writer: &mut Writer<W>, ticket: &Ticket) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tags::TICKET)))?;
    write_value(writer, tags::TICKET_LOTTERY_NUMBER, &ticket.number.to_string())?;
    // owner and comment are left out entirely when empty
    if let Some(owner) = ticket.owner.as_ref().filter(|s| !s.is_empty()) {
        write_value(writer, tags::TICKET_OWNER, owner)?;
    }
    if let Some(comment) = ticket.comment.as_ref().filter(|s| !s.is_empty()) {
        write_value(writer, tags::TICKET_COMMENT, comment)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tags::TICKET)))?;
    Ok(())
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    /// text directly inside this element
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart) -> Result<Element, ImportError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|_| ImportError::InvalidFile)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|_| ImportError::InvalidFile)?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            ..Element::default()
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All elements below this one named `name`, in document order.
    fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    fn first_descendant(&self, name: &str) -> Option<&Element> {
        self.descendants(name).into_iter().next()
    }
}

/// Builds the element tree. `Ok(None)` means the input holds no root
/// element; anything that is not well-formed XML is an invalid file.
fn parse_document<R: BufRead>(input: R) -> Result<Option<Element>, ImportError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut open: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Err(quick_xml::Error::Io(err)) => {
                // the reader holds the only reference, so this unwraps
                let err = Arc::try_unwrap(err)
                    .unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string()));
                return Err(ImportError::Io(err));
            }
            Err(_) => return Err(ImportError::InvalidFile),
            Ok(Event::Start(start)) => {
                if open.is_empty() && root.is_some() {
                    return Err(ImportError::InvalidFile);
                }
                open.push(Element::from_start(&start)?);
            }
            Ok(Event::Empty(start)) => {
                let element = Element::from_start(&start)?;
                attach(&mut open, &mut root, element)?;
            }
            Ok(Event::End(_)) => match open.pop() {
                Some(element) => attach(&mut open, &mut root, element)?,
                None => return Err(ImportError::InvalidFile),
            },
            Ok(Event::Text(text)) => match open.last_mut() {
                Some(element) => {
                    let text = text.unescape().map_err(|_| ImportError::InvalidFile)?;
                    element.text.push_str(&text);
                }
                None => {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(ImportError::InvalidFile);
                    }
                }
            },
            Ok(Event::CData(data)) => {
                let data = str::from_utf8(&data).map_err(|_| ImportError::InvalidFile)?;
                if let Some(element) = open.last_mut() {
                    element.text.push_str(data);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
        }
        buf.clear();
    }

    if !open.is_empty() {
        return Err(ImportError::InvalidFile);
    }
    Ok(root)
}

fn attach(
    open: &mut Vec<Element>,
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ImportError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(ImportError::InvalidFile),
        None => *root = Some(element),
    }
    Ok(())
}

fn read_lottery(root: &Element) -> Result<Lottery, ImportError> {
    if root.name != tags::ROOT {
        return Err(parse_error(format!("Missing root tag {}", tags::ROOT)));
    }

    let node = root
        .first_descendant(tags::MAX_LOTTERY_NUMBER)
        .ok_or_else(|| parse_error(format!("Missing tag {}", tags::MAX_LOTTERY_NUMBER)))?;
    let ceiling = parse_int(&node.text).ok_or_else(|| {
        parse_error(format!(
            "Malformed data in tag {}",
            tags::MAX_LOTTERY_NUMBER
        ))
    })?;

    let node = root
        .first_descendant(tags::TICKETS)
        .ok_or_else(|| parse_error(format!("Missing tag {}", tags::TICKETS)))?;
    let price = node.attribute(tags::TICKETS_PRICE).ok_or_else(|| {
        parse_error(format!(
            "Missing {} attribute in tag {}",
            tags::TICKETS_PRICE,
            tags::TICKETS
        ))
    })?;
    let ticket_price = parse_int(price).ok_or_else(|| {
        parse_error(format!(
            "Malformed data in attribute {} of tag {}",
            tags::TICKETS_PRICE,
            tags::TICKETS
        ))
    })?;

    let mut tickets = Vec::new();
    for entry in node.descendants(tags::TICKET) {
        let number = entry
            .first_descendant(tags::TICKET_LOTTERY_NUMBER)
            .ok_or_else(|| {
                parse_error(format!(
                    "Missing a {} sub-tag in tag {}",
                    tags::TICKET_LOTTERY_NUMBER,
                    tags::TICKET
                ))
            })?;
        let number = parse_int(&number.text).ok_or_else(|| {
            parse_error(format!(
                "Malformed data in sub-tag {} of tag {}",
                tags::TICKET_LOTTERY_NUMBER,
                tags::TICKET
            ))
        })?;

        let mut ticket = Ticket::new(number, ticket_price);
        if let Some(owner) = entry.first_descendant(tags::TICKET_OWNER) {
            ticket = ticket.with_owner(&owner.text);
        }
        if let Some(comment) = entry.first_descendant(tags::TICKET_COMMENT) {
            ticket = ticket.with_comment(&comment.text);
        }
        tickets.push(ticket);
    }

    let mut winners = Vec::new();
    if let Some(node) = root.first_descendant(tags::WINNERS) {
        for entry in node.descendants(tags::WINNER) {
            let number = entry.attribute(tags::WINNER_LOTTERY_NUMBER).ok_or_else(|| {
                parse_error(format!(
                    "Missing a {} attribute in tag {}",
                    tags::WINNER_LOTTERY_NUMBER,
                    tags::WINNER
                ))
            })?;
            let number = parse_int(number).ok_or_else(|| {
                parse_error(format!(
                    "Malformed data in attribute {} of tag {}",
                    tags::WINNER_LOTTERY_NUMBER,
                    tags::WINNER
                ))
            })?;
            winners.push(number);
        }
    }

    Lottery::from_existing(ceiling, ticket_price, tickets, winners)
        .map_err(|err| parse_error(format!("Inconsistent lottery data: {}", err)))
}

fn parse_error(msg: String) -> ImportError {
    ImportError::parse(msg)
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

#[cfg(test)]
fn import_str(doc: &str) -> Result<Lottery, ImportError> {
    Lottery::import_from(doc.as_bytes())
}

#[cfg(test)]
fn export_string(lottery: &Lottery) -> String {
    let mut out = Vec::new();
    lottery.export_to(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[cfg(test)]
fn parse_message(result: Result<Lottery, ImportError>) -> String {
    match result {
        Err(ImportError::ParseError(msg)) => msg,
        Err(err) => panic!("expected parse error, got {:?}", err),
        Ok(_) => panic!("expected parse error, got a lottery"),
    }
}

#[test]
fn export_layout() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    lottery.sell(3, "Alice").unwrap();
    lottery.sell(7, "").unwrap();
    lottery.set_comment(7, "paid later");
    let doc = export_string(&lottery);

    assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(doc.contains("<MaxLotteryNumber>10</MaxLotteryNumber>"));
    assert!(doc.contains("<Tickets Price=\"5\">"));
    assert!(doc.contains("<LotteryNumber>3</LotteryNumber>"));
    assert!(doc.contains("<Owner>Alice</Owner>"));
    assert!(doc.contains("<Comment>paid later</Comment>"));
    assert_eq!(doc.matches("<Owner>").count(), 1);
    assert_eq!(doc.matches("<Comment>").count(), 1);
    assert!(!doc.contains("Winners"));
}

#[test]
fn export_winners() {
    let mut lottery = Lottery::new(1, 5).unwrap();
    lottery.sell(1, "Alice").unwrap();
    lottery.draw_winner().unwrap();
    let doc = export_string(&lottery);
    assert!(doc.contains("<Winners>"));
    assert!(doc.contains("<Winner LotteryNumber=\"1\"/>"));
}

#[test]
fn export_escapes_text() {
    let mut lottery = Lottery::new(5, 1).unwrap();
    lottery.sell(2, "Ben & <Jerry>").unwrap();
    let doc = export_string(&lottery);
    assert!(doc.contains("<Owner>Ben &amp; &lt;Jerry&gt;</Owner>"));

    let imported = import_str(&doc).unwrap();
    assert_eq!(imported.ticket(2).unwrap().owner_name(), "Ben & <Jerry>");
}

#[test]
fn import_hand_written_file() {
    let doc = r#"<?xml version="1.0" encoding="utf-8"?>
<VeletPearLottery>
  <MaxLotteryNumber> 20 </MaxLotteryNumber>
  <Tickets Price="4">
    <Ticket>
      <LotteryNumber>12</LotteryNumber>
      <Owner>Gina</Owner>
    </Ticket>
    <Ticket>
      <Comment>no name given</Comment>
      <LotteryNumber>1</LotteryNumber>
    </Ticket>
  </Tickets>
  <Winners>
    <Winner LotteryNumber="1" />
  </Winners>
</VeletPearLottery>"#;
    let lottery = import_str(doc).unwrap();
    assert_eq!(lottery.ceiling(), 20);
    assert_eq!(lottery.ticket_price(), 4);
    assert_eq!(lottery.remaining(), 18);
    assert_eq!(lottery.ticket(12).unwrap().owner_name(), "Gina");
    assert_eq!(
        lottery.ticket(1).unwrap().comment,
        Some(String::from("no name given"))
    );
    assert_eq!(lottery.winners(), &[1][..]);
    assert_eq!(lottery.total_revenue(), 8);
    lottery.assert_consistent();
}

#[test]
fn import_without_winners_or_tickets() {
    let lottery =
        import_str("<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"0\"/></VeletPearLottery>")
            .unwrap();
    assert_eq!(lottery.ceiling(), 3);
    assert!(lottery.tickets().is_empty());
    assert!(lottery.winners().is_empty());
}

#[test]
fn import_missing_root_is_invalid_file() {
    match import_str("") {
        Err(ImportError::InvalidFile) => {}
        other => panic!("unexpected {:?}", other.map(|l| l.ceiling())),
    }
    match import_str("<?xml version=\"1.0\"?>\n<!-- nothing here -->\n") {
        Err(ImportError::InvalidFile) => {}
        other => panic!("unexpected {:?}", other.map(|l| l.ceiling())),
    }
}

#[test]
fn import_malformed_xml_is_invalid_file() {
    match import_str("<VeletPearLottery><MaxLotteryNumber>3</Tickets></VeletPearLottery>") {
        Err(ImportError::InvalidFile) => {}
        other => panic!("unexpected {:?}", other.map(|l| l.ceiling())),
    }
    match import_str("<VeletPearLottery>") {
        Err(ImportError::InvalidFile) => {}
        other => panic!("unexpected {:?}", other.map(|l| l.ceiling())),
    }
}

#[test]
fn import_wrong_root_is_parse_error() {
    let msg = parse_message(import_str("<Lottery><MaxLotteryNumber>3</MaxLotteryNumber></Lottery>"));
    assert_eq!(msg, "Missing root tag VeletPearLottery");
}

#[test]
fn import_missing_ceiling() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><Tickets Price=\"1\"/></VeletPearLottery>",
    ));
    assert!(msg.contains("MaxLotteryNumber"));
}

#[test]
fn import_malformed_ceiling() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>ten</MaxLotteryNumber><Tickets Price=\"1\"/></VeletPearLottery>",
    ));
    assert_eq!(msg, "Malformed data in tag MaxLotteryNumber");
}

#[test]
fn import_missing_tickets_or_price() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber></VeletPearLottery>",
    ));
    assert_eq!(msg, "Missing tag Tickets");

    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets/></VeletPearLottery>",
    ));
    assert!(msg.contains("Price") && msg.contains("Tickets"));

    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"cheap\"/></VeletPearLottery>",
    ));
    assert_eq!(msg, "Malformed data in attribute Price of tag Tickets");
}

#[test]
fn import_bad_ticket_number() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"1\"><Ticket><Owner>Hal</Owner></Ticket></Tickets></VeletPearLottery>",
    ));
    assert!(msg.contains("LotteryNumber"));

    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"1\"><Ticket><LotteryNumber>x</LotteryNumber></Ticket></Tickets></VeletPearLottery>",
    ));
    assert_eq!(msg, "Malformed data in sub-tag LotteryNumber of tag Ticket");
}

#[test]
fn import_bad_winner() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"1\"/><Winners><Winner/></Winners></VeletPearLottery>",
    ));
    assert_eq!(msg, "Missing a LotteryNumber attribute in tag Winner");

    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"1\"/><Winners><Winner LotteryNumber=\"?\"/></Winners></VeletPearLottery>",
    ));
    assert_eq!(msg, "Malformed data in attribute LotteryNumber of tag Winner");
}

#[test]
fn import_inconsistent_data() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>0</MaxLotteryNumber><Tickets Price=\"1\"/></VeletPearLottery>",
    ));
    assert!(msg.contains("Invalid lottery number"));

    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>3</MaxLotteryNumber><Tickets Price=\"1\"/><Winners><Winner LotteryNumber=\"2\"/></Winners></VeletPearLottery>",
    ));
    assert!(msg.contains("winning number 2"));
}

#[test]
fn import_oversized_ceiling() {
    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>9223372036854775807</MaxLotteryNumber><Tickets Price=\"1\"/></VeletPearLottery>",
    ));
    assert_eq!(msg, "Inconsistent lottery data: Invalid lottery number");

    let msg = parse_message(import_str(
        "<VeletPearLottery><MaxLotteryNumber>2147483648</MaxLotteryNumber><Tickets Price=\"1\"/></VeletPearLottery>",
    ));
    assert_eq!(msg, "Inconsistent lottery data: Invalid lottery number");
}

#[test]
fn import_cdata_values() {
    let lottery = import_str(
        "<VeletPearLottery><MaxLotteryNumber>4</MaxLotteryNumber><Tickets Price=\"1\"><Ticket><LotteryNumber>2</LotteryNumber><Comment><![CDATA[<b>front</b> row]]></Comment></Ticket></Tickets></VeletPearLottery>",
    )
    .unwrap();
    assert_eq!(
        lottery.ticket(2).unwrap().comment,
        Some(String::from("<b>front</b> row"))
    );
}

#[test]
fn import_cdata_rejects_invalid_utf8() {
    let doc: &[u8] = b"<VeletPearLottery><MaxLotteryNumber>4</MaxLotteryNumber><Tickets Price=\"1\"><Ticket><LotteryNumber>2</LotteryNumber><Owner><![CDATA[\xff\xfe]]></Owner></Ticket></Tickets></VeletPearLottery>";
    match Lottery::import_from(doc) {
        Err(ImportError::InvalidFile) => {}
        other => panic!("unexpected {:?}", other.map(|l| l.ceiling())),
    }
}

#[cfg(test)]
#[derive(Debug)]
struct Unplugged;

#[cfg(test)]
impl std::fmt::Display for Unplugged {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "device unplugged")
    }
}

#[cfg(test)]
impl std::error::Error for Unplugged {}

#[cfg(test)]
struct FailingReader;

#[cfg(test)]
impl io::Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, Unplugged))
    }
}

#[test]
fn import_keeps_reader_error() {
    match Lottery::import_from(io::BufReader::new(FailingReader)) {
        Err(ImportError::Io(err)) => {
            assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
            let inner = err.get_ref().and_then(|e| e.downcast_ref::<Unplugged>());
            assert!(inner.is_some());
        }
        other => panic!("unexpected {:?}", other.map(|l| l.ceiling())),
    }
}

// vi: ts=8 sts=4 et
