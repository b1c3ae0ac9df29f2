use crate::lottery::types::Ticket;
use crate::lottery::Lottery;

#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub ceiling: i64,
    pub ticket_price: i64,
    pub remaining: i64,
    pub revenue: i64,
    pub tickets: &'a [Ticket],
    pub winners: Vec<&'a Ticket>,
}

impl Lottery {
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            ceiling: self.ceiling(),
            ticket_price: self.ticket_price(),
            remaining: self.remaining(),
            revenue: self.total_revenue(),
            tickets: self.tickets(),
            winners: self.winning_tickets(),
        }
    }
}

#[test]
fn summary_json() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    lottery.sell(3, "Alice").unwrap();
    lottery.draw_winner().unwrap();

    let json = serde_json::to_value(lottery.summary()).unwrap();
    assert_eq!(json["ceiling"], 10);
    assert_eq!(json["remaining"], 9);
    assert_eq!(json["revenue"], 5);
    assert_eq!(json["tickets"][0]["owner"], "Alice");
    assert_eq!(json["winners"][0]["number"], 3);
}

// vi: ts=8 sts=4 et
