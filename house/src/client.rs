//! Bidder-side state: turns typed commands into requests and server notices
//! into console output.

use std::str::FromStr;

use crate::error::{HouseError, HouseResult};
use crate::protocol::{BidderRequest, Frame, Holder, Notice};

/// A line typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Bid(u64),
    Interested,
    ListHighBid,
    ListDescription,
    Quit,
}

impl FromStr for Command {
    type Err = HouseError;

    fn from_str(line: &str) -> HouseResult<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next(), words.next()) {
            (Some("bid"), Some(amount), None) => Command::Bid(amount.parse().map_err(|_| {
                HouseError::InvalidRequest(format!("'{amount}' is not a valid amount"))
            })?),
            (Some("i_am_interested"), None, None) => Command::Interested,
            (Some("list_high_bid"), None, None) => Command::ListHighBid,
            (Some("list_description"), None, None) => Command::ListDescription,
            (Some("quit"), None, None) => Command::Quit,
            _ => {
                return Err(HouseError::InvalidRequest(
                    "Wrong type of input. Please try again.".into(),
                ))
            }
        };
        Ok(command)
    }
}

/// The item the server is currently auctioning, as seen by this bidder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientItem {
    pub id: u32,
    pub description: String,
    pub price: u64,
    pub holder: Holder,
    pub interested: bool,
}

/// What the console should do in response to one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub lines: Vec<String>,
    pub send: Option<Frame>,
    /// Exit status, when the session is over.
    pub exit: Option<i32>,
}

impl Reaction {
    fn say(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    fn send(mut self, frame: Frame) -> Self {
        self.send = Some(frame);
        self
    }

    fn exit(mut self, code: i32) -> Self {
        self.exit = Some(code);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BidderClient {
    name: String,
    current: Option<ClientItem>,
    won: Vec<ClientItem>,
}

impl BidderClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: None,
            won: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> Option<&ClientItem> {
        self.current.as_ref()
    }

    pub fn won(&self) -> &[ClientItem] {
        &self.won
    }

    pub fn connect_frame(&self) -> Frame {
        BidderRequest::Connect {
            username: self.name.clone(),
        }
        .to_frame(&self.name)
    }

    pub fn on_command(&mut self, command: Command) -> Reaction {
        let reaction = Reaction::default();
        match command {
            Command::ListHighBid => match &self.current {
                Some(item) if item.interested => {
                    reaction.say(format!("Currently highest bid: {}", item.price))
                }
                _ => reaction.say("You are not in the interested users' list for the current item."),
            },
            Command::ListDescription => match &self.current {
                Some(item) if item.interested => reaction.say(format!(
                    "Description of item currently auctioned: {}",
                    item.description
                )),
                _ => reaction.say("You are not in the interested users' list for the current item."),
            },
            Command::Interested => match self.current.as_mut() {
                Some(item) => {
                    item.interested = true;
                    let frame = BidderRequest::Interested { item_id: item.id }.to_frame(&self.name);
                    reaction.send(frame)
                }
                None => reaction.say("There is no item currently auctioned."),
            },
            Command::Bid(amount) => match &self.current {
                Some(item) if amount > item.price => {
                    let frame = BidderRequest::Bid {
                        item_id: item.id,
                        amount,
                    }
                    .to_frame(&self.name);
                    reaction.say("You gave a new bid.").send(frame)
                }
                Some(item) => reaction.say(format!(
                    "Sorry, we cannot accept bids of {} or less.",
                    item.price
                )),
                None => reaction.say("There is no current item to bid for."),
            },
            Command::Quit => {
                let reaction = reaction
                    .say(format!("Bye bye {}", self.name))
                    .send(BidderRequest::Quit.to_frame(&self.name));
                self.summary(reaction).exit(0)
            }
        }
    }

    pub fn on_notice(&mut self, notice: Notice) -> Reaction {
        let reaction = Reaction::default();
        match notice {
            Notice::BidItem {
                item_id,
                description,
                starting_price,
            } => {
                let reaction = reaction
                    .say("New item out for bidding!")
                    .say(format!("Item ID: {item_id}"))
                    .say(format!("Item Description: {description}"))
                    .say(format!("Starting Price: {starting_price}"));
                self.current = Some(ClientItem {
                    id: item_id,
                    description,
                    price: starting_price,
                    holder: Holder::Unheld,
                    interested: false,
                });
                reaction
            }
            Notice::StartBidding { item_id, .. } => match self.current.as_mut() {
                Some(item) if item.id == item_id => {
                    item.interested = true;
                    reaction.say(format!(
                        "You may now start bidding for item with description = {}!",
                        item.description
                    ))
                }
                _ => reaction.say(format!("Bidding opened for item {item_id}.")),
            },
            Notice::NewHighBid { holder, amount } => {
                let reaction = reaction
                    .say(format!("New highest bid for current item belongs to {holder}"))
                    .say(format!("New price: {amount}"));
                if let Some(item) = self.current.as_mut() {
                    item.price = amount;
                    item.holder = holder;
                }
                reaction
            }
            Notice::StopBidding {
                item_id,
                winner,
                highest_bid,
            } => {
                let reaction = reaction.say("You shall now stop bidding for the item.");
                let won = winner.name() == Some(self.name.as_str());
                match self.current.take() {
                    Some(mut item) if won && item.id == item_id => {
                        item.price = highest_bid;
                        item.holder = winner;
                        let line = format!(
                            "Congratulations! The item: {} is yours!",
                            item.description
                        );
                        self.won.push(item);
                        reaction.say(line)
                    }
                    other => {
                        self.current = other.filter(|item| item.id != item_id);
                        reaction
                    }
                }
            }
            Notice::Info(message) => reaction.say(message),
            Notice::AuctionComplete => {
                let reaction = reaction
                    .say("Auction is now completed.")
                    .say("Thank you for your participation");
                self.summary(reaction).exit(0)
            }
            Notice::DuplicateName => reaction
                .say(format!("Username {} already exists.", self.name))
                .exit(1),
        }
    }

    fn summary(&self, reaction: Reaction) -> Reaction {
        if self.won.is_empty() {
            return reaction.say("You bought no items.");
        }
        let mut reaction = reaction.say(format!("You bought {} items!", self.won.len()));
        for item in &self.won {
            reaction = reaction
                .say(format!("Item ID = {}", item.id))
                .say(format!("Item Description = {}", item.description));
        }
        reaction
    }
}
