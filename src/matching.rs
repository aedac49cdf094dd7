//! Price-time priority continuous double auction.
//!
//! Adapted from a teacher limit-order-book implementation: the same
//! price-keyed ordered-map-plus-FIFO-queue structure, the same two-phase
//! "collect fills, then apply" shape — generalized to the simpler contract
//! this kernel exposes (no self-trade prevention, no order types beyond a
//! plain resting limit order, no multi-token book, and funds are checked
//! upfront rather than escrowed).

use std::collections::{BTreeMap, VecDeque};

use crate::amount::Amount;
use crate::error::{ActionRejection, RejectionReason};
use crate::world::{AgentStatus, Order, OrderId, OrderStatus, Side, Trade, World};

/// One resting order at a price level, referenced by id; the level itself
/// is a FIFO queue ordered by order sequence (time priority).
#[derive(Debug, Default)]
struct PriceLevel {
    order_ids: VecDeque<OrderId>,
}

/// The live book. Bids are keyed descending (best bid = highest price),
/// asks ascending (best ask = lowest price) — both via a `BTreeMap`, never a
/// `HashMap`, so iteration order can never leak into observable output.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: BTreeMap<Amount, PriceLevel>,
    asks: BTreeMap<Amount, PriceLevel>,
}

impl OrderBook {
    pub fn new() -> Self {
        OrderBook::default()
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Amount, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn add(&mut self, side: Side, price: Amount, order_id: OrderId) {
        self.levels_mut(side)
            .entry(price)
            .or_default()
            .order_ids
            .push_back(order_id);
    }

    fn remove(&mut self, side: Side, price: Amount, order_id: OrderId) {
        let levels = self.levels_mut(side);
        if let Some(level) = levels.get_mut(&price) {
            level.order_ids.retain(|id| *id != order_id);
            if level.order_ids.is_empty() {
                levels.remove(&price);
            }
        }
    }

    pub fn best_bid(&self) -> Option<Amount> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Amount> {
        self.asks.keys().next().copied()
    }

    pub fn mid_price(&self) -> Option<Amount> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask).checked_div(Amount::parse("2").unwrap())?),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Amount> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Top `depth` aggregated levels per side, best price first.
    pub fn depth(&self, depth: usize, orders: &std::collections::HashMap<OrderId, Order>) -> (Vec<crate::world::DepthLevel>, Vec<crate::world::DepthLevel>) {
        let bid_levels = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| crate::world::DepthLevel {
                price: *price,
                quantity: level
                    .order_ids
                    .iter()
                    .filter_map(|id| orders.get(id))
                    .fold(Amount::ZERO, |acc, o| acc + o.remaining()),
            })
            .collect();
        let ask_levels = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, level)| crate::world::DepthLevel {
                price: *price,
                quantity: level
                    .order_ids
                    .iter()
                    .filter_map(|id| orders.get(id))
                    .fold(Amount::ZERO, |acc, o| acc + o.remaining()),
            })
            .collect();
        (bid_levels, ask_levels)
    }
}

/// The outcome of placing a limit order: the order itself plus any trades it
/// produced immediately, in the order they occurred.
pub struct PlacementOutcome {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Validate and place a limit order, matching it immediately against the
/// opposite side. Validation order matters: the first failing check wins.
#[allow(clippy::too_many_arguments)]
pub fn place_limit_order(
    world: &mut World,
    book: &mut OrderBook,
    agent_id: &str,
    side: Side,
    price: Amount,
    quantity: Amount,
    min_price: Amount,
    max_price: Amount,
    min_quantity: Amount,
    fee_bps: i64,
) -> Result<PlacementOutcome, ActionRejection> {
    if price <= Amount::ZERO || price < min_price || price > max_price {
        return Err(ActionRejection::new(
            RejectionReason::InvalidPrice,
            format!("price {price} out of bounds [{min_price}, {max_price}]"),
        ));
    }
    if quantity <= Amount::ZERO || quantity < min_quantity {
        return Err(ActionRejection::new(
            RejectionReason::InvalidQuantity,
            format!("quantity {quantity} below minimum {min_quantity}"),
        ));
    }

    let agent = world
        .agents
        .get(agent_id)
        .ok_or_else(|| ActionRejection::new(RejectionReason::InvalidAction, "unknown agent"))?;
    if agent.status != AgentStatus::Active {
        return Err(ActionRejection::new(
            RejectionReason::AgentBankrupt,
            "agent is not active",
        ));
    }

    match side {
        Side::Bid => {
            let required = price
                .checked_mul(quantity)
                .ok_or_else(|| ActionRejection::new(RejectionReason::InvalidQuantity, "overflow"))?;
            if agent.cash < required {
                return Err(ActionRejection::new(
                    RejectionReason::InsufficientFunds,
                    format!("cash {} below required {}", agent.cash, required),
                ));
            }
        }
        Side::Ask => {
            if agent.asset < quantity {
                return Err(ActionRejection::new(
                    RejectionReason::InsufficientFunds,
                    format!("asset {} below required {}", agent.asset, quantity),
                ));
            }
        }
    }

    let order_id = world.next_order_id();
    let sequence = world.next_order_sequence();
    let mut incoming = Order {
        id: order_id,
        agent_id: agent_id.to_string(),
        side,
        price,
        quantity,
        filled_quantity: Amount::ZERO,
        status: OrderStatus::Open,
        tick_created: world.current_tick,
        sequence,
    };

    let trades = match_order(world, book, &mut incoming, fee_bps);

    if incoming.remaining() > Amount::ZERO {
        book.add(side, incoming.price, incoming.id);
    }
    world.orders.insert(incoming.id, incoming.clone());

    Ok(PlacementOutcome {
        order: incoming,
        trades,
    })
}

/// Walk the opposite side in price-time priority, filling the incoming
/// order against resting orders until either side is exhausted or the book
/// no longer crosses. Settlement (balance updates) happens inline per fill.
fn match_order(
    world: &mut World,
    book: &mut OrderBook,
    incoming: &mut Order,
    fee_bps: i64,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let opposite = incoming.side.opposite();

    loop {
        if incoming.remaining() <= Amount::ZERO {
            break;
        }
        let best_price = match opposite {
            Side::Bid => book.best_bid(),
            Side::Ask => book.best_ask(),
        };
        let Some(resting_price) = best_price else {
            break;
        };
        let crosses = match incoming.side {
            Side::Bid => incoming.price >= resting_price,
            Side::Ask => incoming.price <= resting_price,
        };
        if !crosses {
            break;
        }

        let resting_order_id = {
            let levels = match opposite {
                Side::Bid => &book.bids,
                Side::Ask => &book.asks,
            };
            levels
                .get(&resting_price)
                .and_then(|level| level.order_ids.front().copied())
        };
        let Some(resting_order_id) = resting_order_id else {
            break;
        };

        let fill_qty = {
            let resting = world
                .orders
                .get(&resting_order_id)
                .expect("resting order referenced by book must exist");
            incoming.remaining().min(resting.remaining())
        };
        if fill_qty <= Amount::ZERO {
            break;
        }

        let trade_price = resting_price;
        let trade_value = trade_price
            .checked_mul(fill_qty)
            .expect("trade value does not overflow");
        let total_fee = trade_value
            .checked_mul_bps(fee_bps)
            .unwrap_or(Amount::ZERO);
        let half = Amount::from_scaled(total_fee.raw() / 2);
        let (buyer_fee, seller_fee) = match incoming.side {
            // The incoming side is the aggressor; it absorbs the odd unit.
            Side::Bid => (total_fee - half, half),
            Side::Ask => (half, total_fee - half),
        };

        let (buy_order_id, sell_order_id, buyer_agent, seller_agent) = match incoming.side {
            Side::Bid => (
                incoming.id,
                resting_order_id,
                incoming.agent_id.clone(),
                world.orders[&resting_order_id].agent_id.clone(),
            ),
            Side::Ask => (
                resting_order_id,
                incoming.id,
                world.orders[&resting_order_id].agent_id.clone(),
                incoming.agent_id.clone(),
            ),
        };

        apply_balances(world, &buyer_agent, trade_value, buyer_fee, fill_qty, true);
        apply_balances(world, &seller_agent, trade_value, seller_fee, fill_qty, false);

        incoming.filled_quantity = incoming.filled_quantity + fill_qty;
        {
            let resting = world
                .orders
                .get_mut(&resting_order_id)
                .expect("resting order must exist");
            resting.filled_quantity = resting.filled_quantity + fill_qty;
            if resting.remaining() <= Amount::ZERO {
                resting.status = OrderStatus::Filled;
                book.remove(opposite, resting_price, resting_order_id);
            }
        }
        if incoming.remaining() <= Amount::ZERO {
            incoming.status = OrderStatus::Filled;
        }

        let trade_id = world.next_trade_id();
        world.total_volume = world.total_volume + trade_value;
        world.total_fees = world.total_fees + total_fee;
        trades.push(Trade {
            id: trade_id,
            tick: world.current_tick,
            price: trade_price,
            quantity: fill_qty,
            buy_order_id,
            sell_order_id,
            buyer_agent_id: buyer_agent,
            seller_agent_id: seller_agent,
            total_fee,
            aggressor_side: incoming.side,
        });
    }

    trades
}

fn apply_balances(
    world: &mut World,
    agent_id: &str,
    trade_value: Amount,
    fee: Amount,
    quantity: Amount,
    is_buyer: bool,
) {
    if let Some(agent) = world.agents.get_mut(agent_id) {
        if is_buyer {
            agent.cash = agent.cash - trade_value - fee;
            agent.asset = agent.asset + quantity;
        } else {
            agent.cash = agent.cash + trade_value - fee;
            agent.asset = agent.asset - quantity;
        }
    }
}

pub fn cancel_order(
    world: &mut World,
    book: &mut OrderBook,
    agent_id: &str,
    order_id: OrderId,
) -> Result<Order, ActionRejection> {
    let order = world
        .orders
        .get(&order_id)
        .ok_or_else(|| ActionRejection::new(RejectionReason::OrderNotFound, "no such order"))?;
    if order.agent_id != agent_id {
        return Err(ActionRejection::new(
            RejectionReason::OrderNotOwned,
            "order belongs to another agent",
        ));
    }
    if order.status != OrderStatus::Open {
        return Err(ActionRejection::new(
            RejectionReason::OrderNotFound,
            "order is not open",
        ));
    }
    let (side, price) = (order.side, order.price);
    book.remove(side, price, order_id);
    let order = world.orders.get_mut(&order_id).expect("checked above");
    order.status = OrderStatus::Cancelled;
    Ok(order.clone())
}

/// Cancel every open order an agent holds, without validation or events —
/// used by the bankruptcy sweep, which subsumes these cancellations under a
/// single `AGENT_BANKRUPT` event.
pub fn cancel_all_open_orders(world: &mut World, book: &mut OrderBook, agent_id: &str) -> Vec<OrderId> {
    let open_ids: Vec<OrderId> = world
        .orders
        .values()
        .filter(|o| o.agent_id == agent_id && o.status == OrderStatus::Open)
        .map(|o| o.id)
        .collect();
    for id in &open_ids {
        let order = world.orders.get(id).expect("collected above");
        let (side, price) = (order.side, order.price);
        book.remove(side, price, *id);
        world.orders.get_mut(id).expect("checked above").status = OrderStatus::Cancelled;
    }
    open_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Agent;

    fn amt(s: &str) -> Amount {
        Amount::parse(s).unwrap()
    }

    fn fresh_agent(id: &str, cash: Amount, asset: Amount) -> Agent {
        Agent {
            id: id.to_string(),
            name: id.to_string(),
            api_key_fingerprint: String::new(),
            cash,
            asset,
            status: AgentStatus::Active,
            actions_this_tick: 0,
            bankrupt_at_tick: None,
        }
    }

    fn setup_world() -> World {
        let mut world = World::new(1);
        world
            .agents
            .insert("a".to_string(), fresh_agent("a", amt("10000"), amt("100")));
        world
            .agents
            .insert("b".to_string(), fresh_agent("b", amt("10000"), amt("100")));
        world
    }

    #[test]
    fn empty_book_accepts_first_order_without_matching() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        let outcome = place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("100"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 10,
        )
        .unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(book.best_ask(), Some(amt("100")));
    }

    #[test]
    fn simple_cross_settles_both_sides() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("100"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 10,
        )
        .unwrap();
        let outcome = place_limit_order(
            &mut world, &mut book, "b", Side::Bid, amt("100"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 10,
        )
        .unwrap();
        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.price, amt("100"));
        assert_eq!(trade.total_fee, amt("1"));
        assert_eq!(world.agents["a"].cash, amt("10999.5"));
        assert_eq!(world.agents["a"].asset, amt("90"));
        assert_eq!(world.agents["b"].cash, amt("8999.5"));
        assert_eq!(world.agents["b"].asset, amt("110"));
    }

    #[test]
    fn price_improvement_favors_aggressor() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("99"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        let outcome = place_limit_order(
            &mut world, &mut book, "b", Side::Bid, amt("100"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        assert_eq!(outcome.trades[0].price, amt("99"));
    }

    #[test]
    fn time_priority_fills_earliest_order_first() {
        let mut world = setup_world();
        world
            .agents
            .insert("c".to_string(), fresh_agent("c", amt("10000"), amt("100")));
        let mut book = OrderBook::new();
        place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("100"), amt("5"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        place_limit_order(
            &mut world, &mut book, "c", Side::Ask, amt("100"), amt("5"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        let outcome = place_limit_order(
            &mut world, &mut book, "b", Side::Bid, amt("100"), amt("3"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].seller_agent_id, "a");
        assert_eq!(world.orders[&0].filled_quantity, amt("3"));
        assert_eq!(world.orders[&0].status, OrderStatus::Open);
    }

    #[test]
    fn partial_ladder_walks_multiple_levels() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("100"), amt("5"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("101"), amt("5"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        let outcome = place_limit_order(
            &mut world, &mut book, "b", Side::Bid, amt("101"), amt("8"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price, amt("100"));
        assert_eq!(outcome.trades[0].quantity, amt("5"));
        assert_eq!(outcome.trades[1].price, amt("101"));
        assert_eq!(outcome.trades[1].quantity, amt("3"));
    }

    #[test]
    fn insufficient_funds_rejected_upfront() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        let result = place_limit_order(
            &mut world, &mut book, "a", Side::Bid, amt("100"), amt("1000"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 10,
        );
        assert_eq!(result.unwrap_err().reason, RejectionReason::InsufficientFunds);
    }

    #[test]
    fn cancel_removes_from_book_with_no_balance_change() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        let outcome = place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("100"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        let cash_before = world.agents["a"].cash;
        cancel_order(&mut world, &mut book, "a", outcome.order.id).unwrap();
        assert_eq!(world.agents["a"].cash, cash_before);
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn cancel_by_non_owner_is_rejected() {
        let mut world = setup_world();
        let mut book = OrderBook::new();
        let outcome = place_limit_order(
            &mut world, &mut book, "a", Side::Ask, amt("100"), amt("10"),
            amt("0.01"), amt("100000"), amt("0.00000001"), 0,
        )
        .unwrap();
        let result = cancel_order(&mut world, &mut book, "b", outcome.order.id);
        assert_eq!(result.unwrap_err().reason, RejectionReason::OrderNotOwned);
    }
}
