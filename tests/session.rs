extern crate lottery;

use lottery::{ConstructionError, ImportError, Lottery, SaleError, SaveFile, Ticket};

fn available(lottery: &Lottery) -> i64 {
    (1..=lottery.ceiling()).filter(|&n| !lottery.is_sold(n)).count() as i64
}

fn check(lottery: &Lottery) {
    assert_eq!(
        lottery.remaining(),
        lottery.ceiling() - lottery.tickets().len() as i64
    );
    assert_eq!(lottery.remaining(), available(lottery));
    for &winner in lottery.winners() {
        assert!(lottery.ticket(winner).is_some());
    }
}

fn round_trip(lottery: &Lottery) -> Lottery {
    let mut out = Vec::new();
    lottery.export_to(&mut out).unwrap();
    Lottery::import_from(&out[..]).unwrap()
}

#[test]
fn construction() {
    for &(ceiling, price) in &[(1, 0), (10, 5), (500, 12)] {
        let lottery = Lottery::new(ceiling, price).unwrap();
        assert_eq!(lottery.remaining(), ceiling);
        assert_eq!(available(&lottery), ceiling);
    }
    assert_eq!(
        Lottery::new(0, 1).unwrap_err(),
        ConstructionError::InvalidCeiling
    );
    assert_eq!(
        Lottery::new(1, -1).unwrap_err(),
        ConstructionError::InvalidPrice
    );
}

#[test]
fn mixed_sales_and_removals() {
    let mut lottery = Lottery::new(40, 3).unwrap().with_seed(11);
    for n in (1..=40).step_by(3) {
        lottery.sell(n, "Jo").unwrap();
        check(&lottery);
    }
    for _ in 0..10 {
        lottery.sell_random("Kim").unwrap();
        check(&lottery);
    }
    for n in 1..=20 {
        lottery.remove(n);
        check(&lottery);
    }
    while lottery.sell_random("Lee").is_some() {
        check(&lottery);
    }
    assert_eq!(lottery.remaining(), 0);
    assert_eq!(lottery.total_revenue(), 120);
}

#[test]
fn sale_errors_do_not_mutate() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    lottery.sell(4, "Max").unwrap();
    match lottery.sell(11, "Ned") {
        Err(SaleError::NumberOutOfRange { number: 11, .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        lottery.sell(4, "Ned").unwrap_err(),
        SaleError::NumberAlreadySold(4)
    );
    assert_eq!(lottery.tickets(), &[Ticket::new(4, 5).with_owner("Max")][..]);
    check(&lottery);
}

#[test]
fn sold_out_random_sale() {
    let mut lottery = Lottery::new(2, 1).unwrap();
    lottery.sell(1, "").unwrap();
    lottery.sell(2, "").unwrap();
    assert!(lottery.sell_random("Oli").is_none());
    assert_eq!(lottery.tickets().len(), 2);
}

#[test]
fn raffle_example() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    lottery.sell(3, "Alice").unwrap();
    lottery.sell(7, "Bob").unwrap();
    let mut draws = 0;
    while lottery.draw_winner().is_some() {
        draws += 1;
        assert!(draws <= 2);
    }
    assert!(lottery.winners().iter().all(|w| *w == 3 || *w == 7));
    assert_eq!(lottery.winners().len(), 2);
    assert_eq!(lottery.total_revenue(), 10);
}

#[test]
fn removed_winner_can_be_resold() {
    let mut lottery = Lottery::new(3, 2).unwrap();
    lottery.sell(2, "Pat").unwrap();
    lottery.draw_winner().unwrap();
    assert!(lottery.is_winner(2));
    lottery.remove(2).unwrap();
    lottery.sell(2, "Quinn").unwrap();
    assert!(!lottery.is_winner(2));
    check(&lottery);
}

#[test]
fn export_import_round_trip() {
    let empty = Lottery::new(15, 0).unwrap();
    let copy = round_trip(&empty);
    assert_eq!(copy.ceiling(), 15);
    assert_eq!(copy.ticket_price(), 0);
    assert!(copy.tickets().is_empty());
    assert!(copy.winners().is_empty());

    let mut lottery = Lottery::new(15, 4).unwrap().with_seed(5);
    lottery.sell(1, "Rae").unwrap();
    lottery.sell(9, "").unwrap();
    lottery.sell(15, "Sam").unwrap();
    lottery.set_comment(9, "left at the bar");
    lottery.draw_winner().unwrap();
    lottery.draw_winner().unwrap();

    let copy = round_trip(&lottery);
    assert_eq!(copy.ceiling(), lottery.ceiling());
    assert_eq!(copy.ticket_price(), lottery.ticket_price());
    assert_eq!(copy.tickets(), lottery.tickets());
    assert_eq!(copy.winners(), lottery.winners());
    assert_eq!(copy.remaining(), 12);
    check(&copy);
}

#[test]
fn no_winners_no_container() {
    let mut lottery = Lottery::new(5, 1).unwrap();
    lottery.sell(5, "Tia").unwrap();
    let mut out = Vec::new();
    lottery.export_to(&mut out).unwrap();
    let doc = String::from_utf8(out).unwrap();
    assert!(!doc.contains("Winner"));
    assert!(Lottery::import_from(doc.as_bytes()).unwrap().winners().is_empty());
}

#[test]
fn missing_ceiling_names_tag() {
    let doc = "<VeletPearLottery><Tickets Price=\"1\"/></VeletPearLottery>";
    match Lottery::import_from(doc.as_bytes()) {
        Err(ImportError::ParseError(msg)) => assert!(msg.contains("MaxLotteryNumber")),
        Err(err) => panic!("unexpected error {:?}", err),
        Ok(_) => panic!("imported a lottery without a ceiling"),
    }
}

#[test]
fn batch_discard_then_commit() {
    let mut lottery = Lottery::new(10, 2).unwrap().with_seed(9);
    {
        let mut batch = lottery.batch();
        batch.sell(1, "Uma").unwrap();
        batch.sell_random("Uma").unwrap();
    }
    assert!(lottery.tickets().is_empty());
    assert_eq!(lottery.remaining(), 10);

    let numbers = {
        let mut batch = lottery.batch();
        batch.sell(1, "").unwrap();
        batch.sell(2, "").unwrap();
        batch.commit("Vic")
    };
    assert_eq!(numbers, vec![1, 2]);
    assert!(lottery.tickets().iter().all(|t| t.owner_name() == "Vic"));
    check(&lottery);
}

#[test]
fn file_round_trip() {
    let path = std::env::temp_dir().join(format!("lottery-session-{}.vplf", std::process::id()));
    let mut lottery = Lottery::new(8, 6).unwrap();
    lottery.sell(8, "Wes").unwrap();
    lottery.save(&path).unwrap();

    let loaded = Lottery::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.tickets(), lottery.tickets());
    assert_eq!(loaded.total_revenue(), 6);
}

// vi: ts=8 sts=4 et
