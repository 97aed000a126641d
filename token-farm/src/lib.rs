// Token farm: stake Mock DAI, earn DApp tokens.
// Investors stake by calling ft_transfer_call on the staking token, which
// routes the deposit into ft_on_transfer here. The owner triggers reward
// issuance, paying rewards out of a pre-funded DApp reserve held by this
// contract. Unstaking is full-withdrawal only.

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::collections::UnorderedMap;
use near_sdk::json_types::U128;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{
    env, near, require, AccountId, BorshStorageKey, Gas, NearToken, PanicOnDefault, Promise,
    PromiseOrValue,
};
use schemars::JsonSchema;

const FARM_NAME: &str = "Dapp Token Farm";

// Reward units issued per staked unit on each issuance round. The only rate
// the farm has ever run with is 1:1; kept as a ratio so a future change is a
// one-line edit.
const REWARD_RATE_NUMERATOR: u128 = 1;
const REWARD_RATE_DENOMINATOR: u128 = 1;

/// Gas allowance for cross-contract FT transfers.
const GAS_FOR_FT_TRANSFER: Gas = Gas::from_tgas(25);
/// Gas allowance for the transfer-result callbacks.
const GAS_FOR_RESOLVE_TRANSFER: Gas = Gas::from_tgas(10);

#[derive(BorshStorageKey, BorshSerialize)]
enum StorageKey {
    Stakes,
}

/// Per-investor staking record. Created on first stake, never removed:
/// a full unstake resets the balance and flag but `has_staked` stays set,
/// distinguishing "fully unstaked" from "never staked".
#[derive(BorshDeserialize, BorshSerialize, Clone, Default)]
pub struct StakeRecord {
    pub staking_balance: u128,
    pub is_staking: bool,
    pub has_staked: bool,
}

/// Serializable view of a staking record returned to clients.
#[derive(Serialize, Deserialize, Clone, JsonSchema)]
#[serde(crate = "near_sdk::serde")]
#[schemars(crate = "schemars")]
pub struct StakeView {
    #[schemars(with = "String")]
    pub account_id: AccountId,
    #[schemars(with = "String")]
    pub staking_balance: U128,
    pub is_staking: bool,
    pub has_staked: bool,
}

impl StakeView {
    fn from_parts(account_id: AccountId, record: StakeRecord) -> Self {
        Self {
            account_id,
            staking_balance: U128(record.staking_balance),
            is_staking: record.is_staking,
            has_staked: record.has_staked,
        }
    }
}

#[near_sdk::ext_contract(ext_ft)]
pub trait ExtFungibleToken {
    fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
}

#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct TokenFarm {
    owner_id: AccountId,
    staking_token_id: AccountId,
    reward_token_id: AccountId,
    stakes: UnorderedMap<AccountId, StakeRecord>,
    total_staked: u128,
    reward_reserve: u128,
}

#[near]
impl TokenFarm {
    /// Deploys the farm bound to its two token contracts. The argument order
    /// (reward first, staking second) matches the original deployment. Both
    /// addresses are fixed for the lifetime of the contract; the deployer
    /// becomes the owner.
    #[init]
    pub fn new(reward_token_id: AccountId, staking_token_id: AccountId) -> Self {
        require!(
            reward_token_id != staking_token_id,
            "Reward and staking token must differ"
        );
        Self {
            owner_id: env::predecessor_account_id(),
            staking_token_id,
            reward_token_id,
            stakes: UnorderedMap::new(StorageKey::Stakes),
            total_staked: 0,
            reward_reserve: 0,
        }
    }

    // Helper for safe balance addition
    fn safe_add(a: u128, b: u128) -> Result<u128, &'static str> {
        a.checked_add(b).ok_or("Balance addition overflow")
    }

    // Helper for safe balance subtraction
    fn safe_sub(a: u128, b: u128) -> Result<u128, &'static str> {
        a.checked_sub(b).ok_or("Balance subtraction underflow")
    }

    fn reward_for(stake: u128) -> u128 {
        stake
            .checked_mul(REWARD_RATE_NUMERATOR)
            .and_then(|x| x.checked_div(REWARD_RATE_DENOMINATOR))
            .expect("Reward calculation overflow")
    }

    fn internal_stake(&mut self, staker: &AccountId, amount: u128) {
        let mut record = self.stakes.get(staker).unwrap_or_default();
        record.staking_balance = Self::safe_add(record.staking_balance, amount)
            .expect("Stake addition overflow");
        record.is_staking = true;
        record.has_staked = true;
        self.stakes.insert(staker, &record);

        self.total_staked = Self::safe_add(self.total_staked, amount)
            .expect("Total stake addition overflow");

        env::log_str(&format!("STAKE: {} staked {} staking units", staker, amount));
    }

    /// Withdraws the caller's entire staked balance back to their wallet.
    /// The ledger is updated before the transfer; if the transfer fails, the
    /// callback restores the stake in full.
    pub fn unstake_tokens(&mut self) -> Promise {
        let staker = env::predecessor_account_id();
        let mut record = self.stakes.get(&staker).expect("No stake found");
        require!(record.staking_balance > 0, "Staking balance cannot be 0");

        let amount = record.staking_balance;
        record.staking_balance = 0;
        record.is_staking = false;
        self.stakes.insert(&staker, &record);

        self.total_staked = Self::safe_sub(self.total_staked, amount)
            .expect("Total stake subtraction underflow");

        env::log_str(&format!(
            "UNSTAKE: {} withdrew {} staking units",
            staker, amount
        ));

        ext_ft::ext(self.staking_token_id.clone())
            .with_attached_deposit(NearToken::from_yoctonear(1))
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(staker.clone(), U128(amount), Some("unstake".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_TRANSFER)
                    .on_unstake_transfer(staker, U128(amount)),
            )
    }

    /// Pays every active staker one reward unit per staked unit out of the
    /// reward reserve (owner only). Staking balances and flags are untouched.
    /// The reserve must cover the whole round up front, so a shortfall
    /// rejects the issuance before any transfer is scheduled.
    pub fn issue_tokens(&mut self) {
        self.assert_owner();

        let payouts: Vec<(AccountId, u128)> = self
            .stakes
            .iter()
            .filter(|(_, record)| record.is_staking && record.staking_balance > 0)
            .map(|(staker, record)| (staker, Self::reward_for(record.staking_balance)))
            .collect();

        let mut total_owed: u128 = 0;
        for (_, reward) in &payouts {
            total_owed = Self::safe_add(total_owed, *reward).expect("Reward total overflow");
        }
        require!(
            total_owed <= self.reward_reserve,
            "Insufficient reward reserve to issue tokens"
        );

        for (staker, reward) in payouts {
            if reward == 0 {
                continue;
            }
            self.reward_reserve = Self::safe_sub(self.reward_reserve, reward)
                .expect("Reserve subtraction underflow");

            env::log_str(&format!(
                "ISSUE: {} reward units issued to {}",
                reward, staker
            ));

            ext_ft::ext(self.reward_token_id.clone())
                .with_attached_deposit(NearToken::from_yoctonear(1))
                .with_static_gas(GAS_FOR_FT_TRANSFER)
                .ft_transfer(
                    staker.clone(),
                    U128(reward),
                    Some("staking reward".to_string()),
                )
                .then(
                    Self::ext(env::current_account_id())
                        .with_static_gas(GAS_FOR_RESOLVE_TRANSFER)
                        .on_reward_transfer(staker, U128(reward)),
                );
        }
    }

    /// Callback after returning staked tokens to an investor. Restores the
    /// stake if the token contract rejected the transfer.
    #[private]
    pub fn on_unstake_transfer(&mut self, staker: AccountId, amount: U128) {
        if !near_sdk::is_promise_success() {
            self.internal_restore_stake(&staker, amount.0);
        }
    }

    /// Callback after a reward payout. Re-credits the reserve if the token
    /// contract rejected the transfer.
    #[private]
    pub fn on_reward_transfer(&mut self, staker: AccountId, amount: U128) {
        if !near_sdk::is_promise_success() {
            self.internal_refund_reward(&staker, amount.0);
        }
    }

    fn internal_restore_stake(&mut self, staker: &AccountId, amount: u128) {
        let mut record = self.stakes.get(staker).unwrap_or_default();
        record.staking_balance = Self::safe_add(record.staking_balance, amount)
            .expect("Stake addition overflow");
        record.is_staking = record.staking_balance > 0;
        record.has_staked = true;
        self.stakes.insert(staker, &record);

        self.total_staked = Self::safe_add(self.total_staked, amount)
            .expect("Total stake addition overflow");

        env::log_str(&format!(
            "UNSTAKE_REVERT: transfer of {} to {} failed, stake restored",
            amount, staker
        ));
    }

    fn internal_refund_reward(&mut self, staker: &AccountId, amount: u128) {
        self.reward_reserve = Self::safe_add(self.reward_reserve, amount)
            .expect("Reserve addition overflow");

        env::log_str(&format!(
            "ISSUE_REVERT: reward transfer of {} to {} failed, reserve restored",
            amount, staker
        ));
    }

    fn assert_owner(&self) {
        require!(
            env::predecessor_account_id() == self.owner_id,
            "Only the owner can call this method"
        );
    }

    // View methods

    pub fn name(&self) -> String {
        FARM_NAME.to_string()
    }

    pub fn staking_balance(&self, account_id: AccountId) -> U128 {
        U128(
            self.stakes
                .get(&account_id)
                .map(|record| record.staking_balance)
                .unwrap_or(0),
        )
    }

    pub fn is_staking(&self, account_id: AccountId) -> bool {
        self.stakes
            .get(&account_id)
            .map(|record| record.is_staking)
            .unwrap_or(false)
    }

    pub fn has_staked(&self, account_id: AccountId) -> bool {
        self.stakes
            .get(&account_id)
            .map(|record| record.has_staked)
            .unwrap_or(false)
    }

    pub fn get_stake_info(&self, account_id: AccountId) -> Option<StakeView> {
        self.stakes
            .get(&account_id)
            .map(|record| StakeView::from_parts(account_id, record))
    }

    /// Paginated listing of all staking records, including fully unstaked ones.
    pub fn get_stakers(&self, from_index: u64, limit: u64) -> Vec<StakeView> {
        self.stakes
            .iter()
            .skip(from_index as usize)
            .take(limit as usize)
            .map(|(account_id, record)| StakeView::from_parts(account_id, record))
            .collect()
    }

    pub fn get_total_staked(&self) -> U128 {
        U128(self.total_staked)
    }

    pub fn get_reward_reserve(&self) -> U128 {
        U128(self.reward_reserve)
    }

    pub fn get_owner(&self) -> AccountId {
        self.owner_id.clone()
    }

    pub fn get_staking_token(&self) -> AccountId {
        self.staking_token_id.clone()
    }

    pub fn get_reward_token(&self) -> AccountId {
        self.reward_token_id.clone()
    }
}

#[near]
impl FungibleTokenReceiver for TokenFarm {
    /// Deposit entry point. Stakes arrive from the staking token contract;
    /// transfers from the reward token contract top up the reward reserve.
    /// Anything else panics, which makes the sending token refund the
    /// transfer in its resolver.
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        require!(amount.0 > 0, "Amount must be > 0");
        let token_id = env::predecessor_account_id();

        if token_id == self.staking_token_id {
            self.internal_stake(&sender_id, amount.0);
        } else if token_id == self.reward_token_id {
            self.reward_reserve = Self::safe_add(self.reward_reserve, amount.0)
                .expect("Reserve addition overflow");
            env::log_str(&format!(
                "FUND: {} reward units deposited by {}",
                amount.0, sender_id
            ));
        } else {
            env::panic_str("Unsupported token");
        }

        if !msg.is_empty() {
            env::log_str(&format!("MEMO: {}", msg));
        }

        // All attached tokens are kept; nothing is refunded.
        PromiseOrValue::Value(U128(0))
    }
}
