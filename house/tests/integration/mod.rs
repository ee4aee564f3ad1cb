mod arbitration;
mod scenarios;
mod timers;
