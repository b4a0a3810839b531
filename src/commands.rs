use std::time::Duration;

use crate::services::telegram::{CallbackQuery, Message, Update};
use crate::AppState;

const USAGE_SETTARGET: &str = "Usage: /settarget <price>\nExample: /settarget 30000";

/// Runs the Telegram long-poll loop until the task is cancelled.
///
/// A failed `getUpdates` call backs off and retries; a failed handler logs
/// and moves on to the next update. Neither ever takes the loop down.
pub async fn run_polling(state: &AppState) {
    let mut offset = 0i64;

    loop {
        let updates = match state
            .telegram
            .get_updates(offset, state.settings.poll_timeout_secs)
            .await
        {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!("[commands] getUpdates failed: {e}");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            if let Err(e) = handle_update(state, update).await {
                tracing::warn!("[commands] update handling failed: {e}");
            }
        }
    }
}

async fn handle_update(state: &AppState, update: Update) -> Result<(), String> {
    if let Some(cb) = update.callback_query {
        return handle_token_selection(state, cb).await;
    }

    let Some(msg) = update.message else {
        return Ok(());
    };
    let Some(text) = msg.text.clone() else {
        return Ok(());
    };

    match text.trim() {
        t if t == "/start" || t.starts_with("/start ") => handle_start(state, &msg).await,
        t if t == "/settarget" || t.starts_with("/settarget ") => {
            let args = t.strip_prefix("/settarget").unwrap_or_default().trim();
            handle_set_target(state, msg.chat.id, args).await
        }
        _ => Ok(()),
    }
}

/// /start: show the top tokens as an inline keyboard.
async fn handle_start(state: &AppState, msg: &Message) -> Result<(), String> {
    let tokens = match state.cmc.list_top_tokens().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("[commands] token listing failed: {e}");
            Default::default()
        }
    };

    if tokens.is_empty() {
        return state
            .telegram
            .send_message(msg.chat.id, "Token list is unavailable right now. Try again in a moment.")
            .await;
    }

    let rows: Vec<(String, String)> = tokens
        .into_iter()
        .map(|(symbol, name)| (name, symbol))
        .collect();

    state
        .telegram
        .send_keyboard(msg.chat.id, "Pick a token:", rows)
        .await
}

/// Inline-keyboard callback: remember the picked symbol for this user.
async fn handle_token_selection(state: &AppState, cb: CallbackQuery) -> Result<(), String> {
    let Some(symbol) = cb.data else {
        return Ok(());
    };

    state.telegram.answer_callback(&cb.id).await?;

    state
        .selections
        .lock()
        .expect("selections lock poisoned")
        .insert(cb.from.id, symbol.clone());

    if let Some(msg) = cb.message {
        return state
            .telegram
            .edit_message_text(
                msg.chat.id,
                msg.message_id,
                &format!("You picked {symbol}. Now set a target with /settarget <price>."),
            )
            .await;
    }

    Ok(())
}

/// /settarget <price>: register a target for the previously picked symbol.
async fn handle_set_target(state: &AppState, chat_id: i64, args: &str) -> Result<(), String> {
    let selected = state
        .selections
        .lock()
        .expect("selections lock poisoned")
        .get(&chat_id)
        .cloned();

    let Some(symbol) = selected else {
        return state
            .telegram
            .send_message(chat_id, "Pick a token first with /start.")
            .await;
    };

    let Some(price) = parse_target_price(args) else {
        return state.telegram.send_message(chat_id, USAGE_SETTARGET).await;
    };

    // Re-validate the symbol against the provider at creation time.
    match state.cmc.list_top_tokens().await {
        Ok(tokens) if !tokens.contains_key(&symbol) => {
            return state
                .telegram
                .send_message(chat_id, "That token is not supported. Use /start to see the list.")
                .await;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("[commands] token validation failed: {e}");
            return state
                .telegram
                .send_message(chat_id, "Could not verify the token right now. Try again in a moment.")
                .await;
        }
    }

    tracing::info!("[commands] user {chat_id} set target {symbol} = {price}");
    state.registry.set_target(chat_id, &symbol, price);

    state
        .telegram
        .send_message(chat_id, &format!("Target for {symbol} set at ${price}"))
        .await
}

/// Accepts positive, finite decimals only.
pub fn parse_target_price(input: &str) -> Option<f64> {
    let price: f64 = input.trim().parse().ok()?;
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    Some(price)
}
