use std::fmt;

/// Progress of one house through the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Offline,
    ReadyToBegin,
    AcceptingInterests,
    WaitingInterestedCount,
    AcceptingBids,
    ReadyToEnd,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Offline => "OFFLINE",
            Phase::ReadyToBegin => "READY_TO_BEGIN",
            Phase::AcceptingInterests => "ACCEPTING_INTERESTS",
            Phase::WaitingInterestedCount => "WAITING_INTERESTED_COUNT",
            Phase::AcceptingBids => "ACCEPTING_BIDS",
            Phase::ReadyToEnd => "READY_TO_END",
        };
        f.write_str(name)
    }
}
