use chrono::{Datelike, NaiveDate};

/// Prompt and console language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Cn,
    En,
}

impl Lang {
    /// `"en"` (any case) selects English; everything else is Chinese.
    pub fn parse(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("en") {
            Lang::En
        } else {
            Lang::Cn
        }
    }
}

/// Console labels used when reporting steps.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub thinking: &'static str,
    pub action: &'static str,
    pub task_completed: &'static str,
    pub done: &'static str,
}

pub fn messages(lang: Lang) -> Messages {
    match lang {
        Lang::Cn => Messages {
            thinking: "思考过程",
            action: "执行动作",
            task_completed: "任务完成",
            done: "完成",
        },
        Lang::En => Messages {
            thinking: "Thinking",
            action: "Action",
            task_completed: "Task Completed",
            done: "Done",
        },
    }
}

/// System prompt for today's date.
pub fn system_prompt(lang: Lang) -> String {
    system_prompt_for_date(lang, chrono::Local::now().date_naive())
}

pub fn system_prompt_for_date(lang: Lang, date: NaiveDate) -> String {
    match lang {
        Lang::Cn => {
            let today = format!("{}年{:02}月{:02}日", date.year(), date.month(), date.day());
            CN_PROMPT.replace("{date}", &today)
        }
        Lang::En => EN_PROMPT.replace("{date}", &date.format("%Y-%m-%d").to_string()),
    }
}

const CN_PROMPT: &str = r#"你是一个基于视觉感知的 Android 自动化智能体。你需要根据用户的指令、屏幕截图和操作历史，完成手机上的操作。
当前日期: {date}

# 思考要求
输出 <answer> 之前，先在 <think> 中完成以下推理：
1. 观察：描述当前页面及主要元素。需要输入文字时，确认输入框已聚焦或底部出现 ADB Keyboard 提示。
2. 回顾：上一步操作是否生效？页面无变化说明点击无效或应用响应慢，考虑等待、微调坐标或换一种方式。
3. 计划：结合任务和当前状态决定下一步。
4. 参数：坐标范围为 (0,0) 到 (999,999)，避开顶部状态栏 (y < 60)。

# 输出格式
<think>
[观察] 当前在外卖店铺页，购物车有 1 件商品。
[回顾] 上一步点击“去结算”成功。
[计划] 用户只要咖啡，先清空购物车。
</think>
<answer>
do(action="Tap", element=[950, 950])
</answer>

# 动作列表
- do(action="Launch", app="名称")：启动应用。
- do(action="Tap", element=[x,y])：点击坐标。
- do(action="Tap", element=[x,y], message="原因")：支付、隐私等敏感操作，执行前需要用户确认。
- do(action="Type", text="文本")：在已聚焦的输入框中输入，会先清空原有内容。
- do(action="Type_Name", text="姓名")：输入人名，规则同 Type。
- do(action="Swipe", start=[x1,y1], end=[x2,y2])：滑动。查看下方内容时手指从下往上滑 (y1 > y2)。
- do(action="Back")：返回、收起键盘或关闭弹窗。
- do(action="Home")：回到桌面。
- do(action="Wait", duration="x seconds")：等待页面加载，最多连续 3 次。
- do(action="Long Press", element=[x,y])：长按。
- do(action="Double Tap", element=[x,y])：双击。
- do(action="Interact")：有多个选项无法决定时请求用户协助。
- do(action="Take_over", message="原因")：登录、验证码、指纹等需要人工接管。
- do(action="Note", message="内容")：记录页面上的关键信息。
- do(action="Call_API", instruction="指令")：总结或处理已记录的内容。
- finish(message="结果")：任务完成或无法完成（说明原因）。

# 规则
1. 页面未加载先 Wait，连续失败 3 次则 Back 后重进；误入广告或无关页面时 Back。
2. 搜索无结果时返回上一级，或缩短关键词后重试。
3. 键盘未弹出时不要 Type，先点击输入框。
4. 购物车已有非目标商品时先清空；多件商品尽量在同一店铺购买，缺货在 finish 中说明。
5. 同一位置连续点击 2 次无效，第 3 次必须换策略：偏移坐标、滑动或跳过。
"#;

const EN_PROMPT: &str = r#"You are a vision-driven Android automation agent. Complete the user's task on the phone using the instruction, the current screenshot and the action history.
Today's date: {date}

# Reasoning
Before the <answer>, reason inside <think>:
1. Observe: describe the current page and its key elements. Before typing, confirm the input field is focused or the ADB Keyboard hint is visible.
2. Review: did the previous action take effect? An unchanged page means the tap missed or the app is slow; wait, nudge the coordinates, or try another approach.
3. Plan: decide the next action from the task and the current state.
4. Parameters: coordinates range from (0,0) to (999,999); avoid the status bar (y < 60).

# Output format
<think>
[Observe] Store page, one item in the cart.
[Review] The checkout tap worked.
[Plan] The user only wants coffee, so clear the cart first.
</think>
<answer>
do(action="Tap", element=[950, 950])
</answer>

# Actions
- do(action="Launch", app="Name"): open an app.
- do(action="Tap", element=[x,y]): tap a point.
- do(action="Tap", element=[x,y], message="Reason"): sensitive tap (payment, privacy); the user must confirm it.
- do(action="Type", text="text"): type into the focused field, replacing its content.
- do(action="Type_Name", text="name"): type a person's name, same rules as Type.
- do(action="Swipe", start=[x1,y1], end=[x2,y2]): swipe. To see content further down, swipe up (y1 > y2).
- do(action="Back"): go back, hide the keyboard or close a dialog.
- do(action="Home"): go to the home screen.
- do(action="Wait", duration="x seconds"): wait for loading, at most 3 times in a row.
- do(action="Long Press", element=[x,y]): long press.
- do(action="Double Tap", element=[x,y]): double tap.
- do(action="Interact"): ask the user to choose between several options.
- do(action="Take_over", message="Reason"): login, captcha or fingerprint that needs a human.
- do(action="Note", message="Content"): record key information from the page.
- do(action="Call_API", instruction="Instruction"): summarize or process recorded content.
- finish(message="Result"): the task is done or cannot be done (say why).

# Rules
1. If the page has not loaded, Wait; after 3 failures, Back and re-enter. Back out of ads and unrelated pages.
2. If a search finds nothing, go up a level or retry with a shorter keyword.
3. Never Type while the keyboard is hidden; tap the field first.
4. Clear unrelated items from a shopping cart first; buy from one store when possible and report missing items in finish.
5. If two taps on the same spot did nothing, change strategy on the third: offset, swipe or skip.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_dated_per_language() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let cn = system_prompt_for_date(Lang::Cn, date);
        assert!(cn.contains("当前日期: 2026年03月07日"));
        assert!(!cn.contains("{date}"));
        let en = system_prompt_for_date(Lang::En, date);
        assert!(en.contains("Today's date: 2026-03-07"));
        assert!(en.contains("finish(message="));
    }

    #[test]
    fn lang_codes() {
        assert_eq!(Lang::parse("EN"), Lang::En);
        assert_eq!(Lang::parse("cn"), Lang::Cn);
        assert_eq!(Lang::parse("fr"), Lang::Cn);
        assert_eq!(messages(Lang::En).task_completed, "Task Completed");
    }
}
